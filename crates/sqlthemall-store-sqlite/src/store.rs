//! [`SqliteStore`]: async access to the database behind the importer.

use serde_json::Value;
use sqlthemall_core::{Catalog, InsertStats, infer_schema, map_document, persist};
use tracing::debug;

use crate::{
  DatabaseUrl, Result, export::export_documents, reflect::reflect, schema::PRAGMAS,
  writer::SqlWriter,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A SQLite database holding imported documents.
///
/// Cloning is cheap: the inner connection is reference-counted. Clones share
/// the connection but not any [`Catalog`]; see [`crate::Importer`].
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open the database named by a connection string such as `sqlite://` or
  /// `sqlite:///var/data/import.sqlite`.
  pub async fn connect(url: &str) -> Result<Self> {
    match url.parse::<DatabaseUrl>()? {
      DatabaseUrl::Memory => Self::open_in_memory().await,
      DatabaseUrl::File(path) => Self::open(path).await,
    }
  }

  /// Open (or create) a database file.
  pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Open an in-memory database, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read the current schema.
  pub async fn reflect(&self) -> Result<Catalog> {
    self.conn.call(|conn| Ok(reflect(conn))).await?
  }

  /// Run the schema inference walk for `value` against `catalog`.
  ///
  /// Every table and column is created with its own statement, outside any
  /// transaction, so a failure keeps the changes made before it. Returns
  /// whether anything was created; the caller re-reflects.
  pub async fn apply_schema(
    &self,
    mut catalog: Catalog,
    value: Value,
    root_table: String,
    simple: bool,
  ) -> Result<bool> {
    self
      .conn
      .call(move |conn| {
        let mut writer = SqlWriter::new(conn);
        Ok(infer_schema(&mut catalog, &mut writer, &root_table, &value, simple))
      })
      .await?
      .map_err(Into::into)
  }

  /// Map `value` onto `catalog` and write the rows in one transaction.
  ///
  /// Nothing is committed unless every row is written; on error the
  /// transaction is rolled back when it is dropped.
  pub async fn write_document(
    &self,
    catalog: Catalog,
    value: Value,
    root_table: String,
    dedup: bool,
  ) -> Result<InsertStats> {
    self
      .conn
      .call(move |conn| Ok(write_document(conn, &catalog, &value, &root_table, dedup)))
      .await?
  }

  /// Rebuild the documents stored under `root_table`, one per root row.
  pub async fn export(&self, catalog: Catalog, root_table: String) -> Result<Vec<Value>> {
    self
      .conn
      .call(move |conn| Ok(export_documents(conn, &catalog, &root_table)))
      .await?
  }

  /// Number of rows in `table`.
  pub async fn count_rows(&self, table: String) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", crate::schema::quote_ident(&table));
    let count = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
      .await?;
    Ok(count)
  }
}

fn write_document(
  conn: &mut rusqlite::Connection,
  catalog: &Catalog,
  value: &Value,
  root_table: &str,
  dedup: bool,
) -> Result<InsertStats> {
  let mapped = map_document(catalog, root_table, value)?;
  if mapped.is_empty() {
    debug!(root_table, "document produced no rows");
    return Ok(InsertStats::default());
  }

  let tx = conn.transaction()?;
  let stats = persist(&mut SqlWriter::new(&tx), catalog, &mapped, dedup)?;
  tx.commit()?;
  Ok(stats)
}
