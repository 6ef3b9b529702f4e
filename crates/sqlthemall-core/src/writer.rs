//! The seams between the core algorithms and a physical database.
//!
//! Both traits are synchronous: a backend runs the whole inference walk or
//! the whole persistence walk on its own connection thread.

use crate::{
  catalog::{ColumnDef, TableDef},
  shape::Scalar,
};

/// Applies schema changes one statement at a time.
///
/// Changes are applied as soon as the inference walk decides on them, so a
/// failure mid-walk leaves the earlier changes in place.
pub trait SchemaWriter {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create `table` with its primary key (if any), scalar columns and
  /// foreign keys.
  fn create_table(&mut self, table: &TableDef) -> Result<(), Self::Error>;

  fn add_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), Self::Error>;
}

/// Row-level writes, all inside one transaction owned by the backend.
pub trait RowWriter {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The `_id` of the first row whose columns equal every given value.
  ///
  /// Callers treat an error here as "no match".
  fn find_row(
    &mut self,
    table: &str,
    scalars: &[(String, Scalar)],
  ) -> Result<Option<i64>, Self::Error>;

  /// Insert a row and return its new `_id`. `parent` optionally sets a
  /// foreign key column at insert time.
  fn insert_row(
    &mut self,
    table: &str,
    scalars: &[(String, Scalar)],
    parent: Option<(&str, i64)>,
  ) -> Result<i64, Self::Error>;

  /// Point an existing row at a (new) parent.
  fn set_parent(
    &mut self,
    table: &str,
    row_id: i64,
    column: &str,
    parent_id: i64,
  ) -> Result<(), Self::Error>;

  /// Ensure the junction row `(parent_id, child_id)` exists in `bridge`.
  /// Returns `false` when it was already present.
  fn link_bridge(
    &mut self,
    bridge: &str,
    parent: (&str, i64),
    child: (&str, i64),
  ) -> Result<bool, Self::Error>;
}
