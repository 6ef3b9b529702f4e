//! Core model and algorithms for turning JSON documents into relational rows.
//!
//! This crate has no database dependencies. It owns the schema
//! [`Catalog`](catalog::Catalog), the recursive schema inference walk and the
//! object mapper. Backends plug in through the
//! [`SchemaWriter`](writer::SchemaWriter) and [`RowWriter`](writer::RowWriter)
//! traits (see `sqlthemall-store-sqlite`).

pub mod catalog;
pub mod error;
pub mod infer;
pub mod mapper;
pub mod row;
pub mod shape;
pub mod writer;

#[cfg(test)]
mod testing;

pub use catalog::{Catalog, ColumnDef, ForeignKey, Link, RelationKind, ScalarType, TableDef};
pub use error::{Error, Result};
pub use infer::infer_schema;
pub use mapper::{InsertStats, Mapped, map_document, persist};
pub use row::{Collection, Row};
pub use shape::{Scalar, Shape};
pub use writer::{RowWriter, SchemaWriter};
