//! Error type for `sqlthemall-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] sqlthemall_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// The connection string names a backend other than SQLite.
  #[error("unsupported database url: {0:?}")]
  UnsupportedUrl(String),

  #[error("root table does not exist: {0}")]
  RootTableMissing(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
