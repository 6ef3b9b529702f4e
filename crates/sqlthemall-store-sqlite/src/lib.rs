//! SQLite backend for the JSON importer.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each schema walk and each document
//! insert runs as one call on that thread, against the synchronous
//! [`SqlWriter`](writer::SqlWriter).

mod encode;
mod export;
mod reflect;
mod schema;
mod store;
mod url;
mod writer;

pub mod error;
pub mod importer;

pub use error::{Error, Result};
pub use importer::{BatchMode, BatchReport, ImportOptions, Importer};
pub use store::SqliteStore;
pub use url::DatabaseUrl;

#[cfg(test)]
mod tests;
