//! [`Importer`]: schema inference followed by insertion, against one store
//! and one in-memory [`Catalog`].

use serde::Deserialize;
use serde_json::Value;
use sqlthemall_core::{Catalog, InsertStats};
use tracing::{debug, info, warn};

use crate::{Error, Result, SqliteStore};

// ─── Options ─────────────────────────────────────────────────────────────────

/// How documents are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
  /// Table that receives the top level of each document. Lower-cased.
  pub root_table: String,
  /// Use direct foreign keys for lists instead of bridge tables, and skip
  /// row deduplication.
  pub simple:     bool,
}

impl Default for ImportOptions {
  fn default() -> Self { Self { root_table: "main".to_owned(), simple: false } }
}

impl ImportOptions {
  pub fn new(root_table: &str, simple: bool) -> Self {
    Self { root_table: root_table.to_lowercase(), simple }
  }
}

/// How [`Importer::import_batch`] treats a group of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
  /// One schema walk and one transaction for the whole group, stored as a
  /// list under the root table. A failure loses the whole group.
  #[default]
  Batched,
  /// One import per document; failures are collected and the rest go on.
  Sequential,
}

/// Outcome of [`Importer::import_batch`].
#[derive(Debug, Default)]
pub struct BatchReport {
  /// Documents committed.
  pub imported: usize,
  /// Position in the batch and error of each document that failed.
  pub failed:   Vec<(usize, Error)>,
  pub stats:    InsertStats,
}

// ─── Importer ────────────────────────────────────────────────────────────────

/// Imports JSON documents into a [`SqliteStore`].
///
/// The importer owns its view of the schema. Two importers over the same
/// database do not see each other's schema changes until
/// [`refresh`](Self::refresh), so imports into one database should go through
/// a single importer.
pub struct Importer {
  store:   SqliteStore,
  catalog: Catalog,
  options: ImportOptions,
}

impl Importer {
  /// Open the database at `url` and read its schema.
  pub async fn connect(url: &str, options: ImportOptions) -> Result<Self> {
    Self::new(SqliteStore::connect(url).await?, options).await
  }

  pub async fn new(store: SqliteStore, mut options: ImportOptions) -> Result<Self> {
    options.root_table = options.root_table.to_lowercase();
    let catalog = store.reflect().await?;
    debug!(tables = catalog.len(), "read existing schema");
    Ok(Self { store, catalog, options })
  }

  pub fn catalog(&self) -> &Catalog { &self.catalog }

  pub fn options(&self) -> &ImportOptions { &self.options }

  pub fn store(&self) -> &SqliteStore { &self.store }

  /// Re-read the schema from the database.
  pub async fn refresh(&mut self) -> Result<()> {
    self.catalog = self.store.reflect().await?;
    Ok(())
  }

  /// Create the tables and columns `value` needs under the configured root
  /// table. Returns whether the schema changed.
  pub async fn infer_schema(&mut self, value: &Value) -> Result<bool> {
    let ImportOptions { root_table, simple } = self.options.clone();
    self.infer_schema_with(value, &root_table, simple).await
  }

  /// [`infer_schema`](Self::infer_schema) with an explicit root table and
  /// layout.
  ///
  /// The catalog is re-read after any change, and after a failure, since the
  /// statements applied before it are kept.
  pub async fn infer_schema_with(
    &mut self,
    value: &Value,
    root_table: &str,
    simple: bool,
  ) -> Result<bool> {
    let result = self
      .store
      .apply_schema(self.catalog.clone(), value.clone(), root_table.to_lowercase(), simple)
      .await;

    match result {
      Ok(false) => Ok(false),
      Ok(true) => {
        self.refresh().await?;
        info!(tables = self.catalog.len(), "schema updated");
        Ok(true)
      }
      Err(err) => {
        if let Err(refresh) = self.refresh().await {
          warn!(error = %refresh, "could not re-read schema after failed update");
        }
        Err(err)
      }
    }
  }

  /// Write `value` into the existing schema under the configured root table,
  /// in one transaction.
  pub async fn insert(&self, value: &Value) -> Result<InsertStats> {
    self.insert_into(value, &self.options.root_table).await
  }

  /// [`insert`](Self::insert) under an explicit root table.
  pub async fn insert_into(&self, value: &Value, root_table: &str) -> Result<InsertStats> {
    let root_table = root_table.to_lowercase();
    if !self.catalog.contains(&root_table) {
      return Err(Error::RootTableMissing(root_table));
    }

    let stats = self
      .store
      .write_document(self.catalog.clone(), value.clone(), root_table, !self.options.simple)
      .await?;
    debug!(?stats, "document written");
    Ok(stats)
  }

  /// [`infer_schema`](Self::infer_schema), then [`insert`](Self::insert).
  pub async fn import(&mut self, value: &Value) -> Result<InsertStats> {
    let root_table = self.options.root_table.clone();
    self.import_into(value, &root_table).await
  }

  /// [`import`](Self::import) under an explicit root table.
  pub async fn import_into(&mut self, value: &Value, root_table: &str) -> Result<InsertStats> {
    self.infer_schema_with(value, root_table, self.options.simple).await?;
    self.insert_into(value, root_table).await
  }

  /// Import a group of documents under the configured root table, see
  /// [`BatchMode`].
  pub async fn import_batch(&mut self, values: Vec<Value>, mode: BatchMode) -> Result<BatchReport> {
    let root_table = self.options.root_table.clone();
    self.import_batch_into(values, &root_table, mode).await
  }

  /// [`import_batch`](Self::import_batch) under an explicit root table.
  ///
  /// In batched mode an error is returned as is and nothing from the group is
  /// committed. In sequential mode each document commits on its own and the
  /// report lists the ones that failed.
  pub async fn import_batch_into(
    &mut self,
    values: Vec<Value>,
    root_table: &str,
    mode: BatchMode,
  ) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    match mode {
      BatchMode::Batched => {
        let count = values.len();
        report.stats = self.import_into(&Value::Array(values), root_table).await?;
        report.imported = count;
      }
      BatchMode::Sequential => {
        for (index, value) in values.iter().enumerate() {
          match self.import_into(value, root_table).await {
            Ok(stats) => {
              report.imported += 1;
              report.stats += stats;
            }
            Err(err) => {
              warn!(index, error = %err, "document failed, continuing");
              report.failed.push((index, err));
            }
          }
        }
      }
    }
    Ok(report)
  }

  /// Rebuild the documents stored under the configured root table.
  pub async fn export(&self) -> Result<Vec<Value>> {
    self.store.export(self.catalog.clone(), self.options.root_table.clone()).await
  }
}
