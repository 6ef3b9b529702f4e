//! End-to-end tests for `Importer` against in-memory and on-disk databases.

use serde_json::{Value, json};
use sqlthemall_core::{ForeignKey, ScalarType};

use crate::{BatchMode, DatabaseUrl, Error, ImportOptions, Importer};

async fn importer() -> Importer {
  Importer::connect("sqlite://", ImportOptions::default())
    .await
    .expect("in-memory importer")
}

async fn simple_importer() -> Importer {
  Importer::connect("sqlite://", ImportOptions::new("main", true))
    .await
    .expect("in-memory importer")
}

async fn count(importer: &Importer, table: &str) -> i64 {
  importer.store().count_rows(table.to_owned()).await.unwrap()
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn infer_schema_is_idempotent() {
  let mut imp = importer().await;
  let doc = json!({"a": 1, "owner": {"name": "x"}, "tags": ["t", "u"]});

  assert!(imp.infer_schema(&doc).await.unwrap());
  let catalog = imp.catalog().clone();

  assert!(!imp.infer_schema(&doc).await.unwrap());
  assert_eq!(imp.catalog(), &catalog);
}

#[tokio::test]
async fn reflected_schema_matches_document() {
  let mut imp = importer().await;
  let doc = json!({"Name": "a", "count": 1, "ratio": 0.5, "ok": false, "born": "2001-02-03"});

  imp.infer_schema(&doc).await.unwrap();

  let main = imp.catalog().table("main").unwrap();
  assert!(main.primary_key);
  let columns: Vec<_> = main.columns.iter().map(|c| (c.name.as_str(), c.ty)).collect();
  assert_eq!(columns, vec![
    ("name", ScalarType::String),
    ("count", ScalarType::Integer),
    ("ratio", ScalarType::Float),
    ("ok", ScalarType::Boolean),
    ("born", ScalarType::Date),
  ]);
}

#[tokio::test]
async fn empty_values_are_pruned() {
  let mut imp = importer().await;

  let stats = imp.import(&json!({"a": null, "b": [], "c": {}})).await.unwrap();

  assert_eq!(imp.catalog().len(), 1);
  assert!(imp.catalog().table("main").unwrap().columns.is_empty());
  assert_eq!(stats.rows(), 0);
  assert_eq!(count(&imp, "main").await, 0);
}

#[tokio::test]
async fn list_creates_table_and_bridge() {
  let mut imp = importer().await;

  imp.import(&json!({"tags": ["x", "y"]})).await.unwrap();

  let tags = imp.catalog().table("tags").unwrap();
  assert_eq!(tags.columns.len(), 1);
  assert_eq!(tags.columns[0].name, "value");
  let bridge = imp.catalog().table("bridge_main_tags").unwrap();
  assert!(bridge.is_bridge());
  assert!(bridge.foreign_keys.contains(&ForeignKey::to_parent("main")));
  assert!(bridge.foreign_keys.contains(&ForeignKey::to_parent("tags")));
  assert_eq!(count(&imp, "tags").await, 2);
}

#[tokio::test]
async fn bridge_rows_link_parent_and_children() {
  let mut imp = importer().await;

  let stats = imp.import(&json!({"name": "n", "tags": ["x", "y"]})).await.unwrap();

  assert_eq!(stats.inserted, 3);
  assert_eq!(stats.linked, 2);
  assert_eq!(count(&imp, "bridge_main_tags").await, 2);
}

#[tokio::test]
async fn simple_mode_uses_direct_key() {
  let mut imp = simple_importer().await;

  imp.import(&json!({"tags": ["x", "y"]})).await.unwrap();

  let tags = imp.catalog().table("tags").unwrap();
  assert_eq!(tags.foreign_keys, vec![ForeignKey::to_parent("main")]);
  assert!(!imp.catalog().contains("bridge_main_tags"));
  assert_eq!(count(&imp, "tags").await, 2);
}

#[tokio::test]
async fn reserved_table_name_fails_and_keeps_earlier_columns() {
  let mut imp = importer().await;

  let err = imp.infer_schema(&json!({"a": 1, "sqlite_stuff": {"b": 2}})).await;

  assert!(matches!(err, Err(Error::Core(sqlthemall_core::Error::Backend(_)))));
  assert!(imp.catalog().table("main").unwrap().column("a").is_some());
  assert!(!imp.catalog().contains("sqlite_stuff"));
}

#[tokio::test]
async fn keyword_root_table_is_quoted() {
  let mut imp = Importer::connect("sqlite://", ImportOptions::new("Order", false))
    .await
    .unwrap();

  imp.import(&json!({"select": "x", "group": {"from": 1}})).await.unwrap();

  assert!(imp.catalog().contains("order"));
  assert_eq!(count(&imp, "order").await, 1);
  assert_eq!(count(&imp, "group").await, 1);
}

// ─── Rows ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn same_flat_object_is_stored_once() {
  let mut imp = importer().await;
  let doc = json!({"x": 1, "y": "a"});

  imp.import(&doc).await.unwrap();
  let stats = imp.import(&doc).await.unwrap();

  assert_eq!(stats.reused, 1);
  assert_eq!(count(&imp, "main").await, 1);
}

#[tokio::test]
async fn simple_mode_keeps_duplicates() {
  let mut imp = simple_importer().await;
  let doc = json!({"x": 1, "y": "a"});

  imp.import(&doc).await.unwrap();
  imp.import(&doc).await.unwrap();

  assert_eq!(count(&imp, "main").await, 2);
}

#[tokio::test]
async fn same_key_writes_into_one_table() {
  let mut imp = importer().await;
  let doc = json!({
    "owner":    {"person": {"name": "a"}},
    "reviewer": {"person": {"name": "b"}}
  });

  imp.import(&doc).await.unwrap();

  assert_eq!(imp.catalog().tables().filter(|t| t.name == "person").count(), 1);
  assert_eq!(count(&imp, "person").await, 2);
}

#[tokio::test]
async fn conflicting_value_is_written_as_is() {
  let mut imp = importer().await;

  imp.import(&json!({"a": 1})).await.unwrap();
  imp.import(&json!({"a": "text"})).await.unwrap();

  assert_eq!(imp.catalog().table("main").unwrap().column("a").unwrap().ty, ScalarType::Integer);
  assert_eq!(imp.export().await.unwrap(), vec![json!({"a": 1}), json!({"a": "text"})]);
}

#[tokio::test]
async fn insert_without_schema_fails() {
  let imp = importer().await;

  let err = imp.insert(&json!({"a": 1})).await;

  assert!(matches!(err, Err(Error::RootTableMissing(t)) if t == "main"));
}

#[tokio::test]
async fn failed_row_rolls_back_whole_document() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("import.sqlite");
  let mut imp = Importer::connect(&DatabaseUrl::File(path.clone()).to_string(), ImportOptions::default())
    .await
    .unwrap();
  imp.import(&json!({"a": 1, "owner": {"n": 1}})).await.unwrap();

  // Pull a column out from under the importer's catalog.
  let raw = rusqlite::Connection::open(&path).unwrap();
  raw.execute_batch("ALTER TABLE \"owner\" DROP COLUMN \"n\"").unwrap();

  let err = imp.insert(&json!({"a": 2, "owner": {"n": 2}})).await;

  assert!(err.is_err());
  assert_eq!(count(&imp, "main").await, 1);
  assert_eq!(count(&imp, "owner").await, 1);
}

// ─── Round trip ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn export_rebuilds_document() {
  let mut imp = importer().await;
  let doc = json!({
    "Name":   "x",
    "count":  2,
    "ratio":  1.5,
    "active": true,
    "born":   "1990-01-02",
    "owner":  {"name": "o", "address": {"city": "c"}},
    "tags":   ["a", "b"],
    "items":  [{"sku": "1", "qty": 2}, {"sku": "2", "qty": 3}]
  });

  imp.import(&doc).await.unwrap();

  // Nested objects come back as one-element lists.
  let expected = json!({
    "name":   "x",
    "count":  2,
    "ratio":  1.5,
    "active": true,
    "born":   "1990-01-02",
    "owner":  [{"name": "o", "address": [{"city": "c"}]}],
    "tags":   ["a", "b"],
    "items":  [{"sku": "1", "qty": 2}, {"sku": "2", "qty": 3}]
  });
  assert_eq!(imp.export().await.unwrap(), vec![expected]);
}

#[tokio::test]
async fn export_without_root_table_fails() {
  let imp = importer().await;
  assert!(matches!(imp.export().await, Err(Error::RootTableMissing(_))));
}

// ─── Batches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batched_import_stores_every_element() {
  let mut imp = importer().await;
  let docs = vec![json!({"a": 1}), json!({"a": 2, "b": "x"})];

  let report = imp.import_batch(docs, BatchMode::Batched).await.unwrap();

  assert_eq!(report.imported, 2);
  assert!(report.failed.is_empty());
  assert_eq!(report.stats.inserted, 2);
  assert_eq!(count(&imp, "main").await, 2);
}

#[tokio::test]
async fn sequential_import_isolates_failures() {
  let mut imp = importer().await;
  let docs = vec![json!({"a": 1}), json!(3), json!({"a": 2})];

  let report = imp.import_batch(docs, BatchMode::Sequential).await.unwrap();

  assert_eq!(report.imported, 2);
  assert_eq!(report.failed.len(), 1);
  assert_eq!(report.failed[0].0, 1);
  assert!(matches!(report.failed[0].1, Error::Core(sqlthemall_core::Error::InvalidRoot(_))));
  assert_eq!(count(&imp, "main").await, 2);
}

#[tokio::test]
async fn batch_into_other_root_table() {
  let mut imp = importer().await;
  let docs = vec![json!({"sku": "a"}), json!({"sku": "b"})];

  let report = imp.import_batch_into(docs.clone(), "Items", BatchMode::Sequential).await.unwrap();
  assert_eq!(report.imported, 2);
  let report = imp.import_batch_into(docs, "items", BatchMode::Batched).await.unwrap();
  assert_eq!(report.stats.reused, 2);

  assert!(!imp.catalog().contains("main"));
  assert_eq!(count(&imp, "items").await, 2);
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn reopened_database_keeps_schema_and_rows() {
  let dir = tempfile::tempdir().unwrap();
  let url = DatabaseUrl::File(dir.path().join("import.sqlite")).to_string();
  let doc = json!({"name": "a", "tags": ["x"]});

  let catalog = {
    let mut imp = Importer::connect(&url, ImportOptions::default()).await.unwrap();
    imp.import(&doc).await.unwrap();
    imp.catalog().clone()
  };

  let mut imp = Importer::connect(&url, ImportOptions::default()).await.unwrap();
  assert_eq!(imp.catalog(), &catalog);
  assert!(!imp.infer_schema(&doc).await.unwrap());

  imp.insert(&doc).await.unwrap();
  assert_eq!(count(&imp, "main").await, 1);
  assert_eq!(count(&imp, "tags").await, 1);
  assert_eq!(count(&imp, "bridge_main_tags").await, 1);

  let exported: Vec<Value> = imp.export().await.unwrap();
  assert_eq!(exported, vec![json!({"name": "a", "tags": ["x"]})]);
}
