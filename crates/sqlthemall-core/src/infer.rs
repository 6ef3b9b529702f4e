//! Schema inference: make sure every table and column needed to store a
//! document exists.
//!
//! The walk is lazy (empty values never create anything), additive (columns
//! are never dropped or retyped) and flattening (a table is identified by its
//! key name alone, wherever the key appears in the document).

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::{
  Error, Result,
  catalog::{Catalog, ColumnDef, RelationKind, ScalarType, TableDef},
  shape::{self, Object, Shape},
  writer::SchemaWriter,
};

/// Walk `value` and create whatever `root_table` and its descendants are
/// missing, through `writer`. `catalog` is updated in step with the writes.
///
/// Returns whether anything was created. Writer errors abort the walk; the
/// changes applied before the failure stay in both the database and
/// `catalog`.
pub fn infer_schema<W: SchemaWriter>(
  catalog: &mut Catalog,
  writer: &mut W,
  root_table: &str,
  value: &Value,
  simple: bool,
) -> Result<bool> {
  let root_table = root_table.to_lowercase();
  let root = shape::root_object(&root_table, value)?;

  let mut walk = SchemaWalk { catalog, writer, simple, changed: false };
  if !walk.catalog.contains(&root_table) {
    info!(table = %root_table, "creating root table");
    walk.create_table(TableDef::new(&root_table))?;
  }
  walk.parse_object(&root_table, &root)?;
  Ok(walk.changed)
}

/// What a table already has under a given key.
enum Existing {
  Nothing,
  Scalar(ScalarType),
  /// `_id` or a foreign key column.
  Reserved,
}

struct SchemaWalk<'a, W> {
  catalog: &'a mut Catalog,
  writer:  &'a mut W,
  simple:  bool,
  changed: bool,
}

impl<W: SchemaWriter> SchemaWalk<'_, W> {
  fn parse_object(&mut self, table: &str, obj: &Object) -> Result<()> {
    for (key, value) in shape::fields(obj) {
      let existing = self.existing(table, &key)?;

      match shape::classify(value) {
        Shape::Empty => trace!(table, key = %key, "empty value, nothing to create"),

        Shape::Scalar(scalar) => match existing {
          Existing::Nothing => {
            self.add_column(table, ColumnDef::new(key, scalar.scalar_type()))?;
          }
          Existing::Scalar(ty) if ty != scalar.scalar_type() => warn!(
            table,
            column = %key,
            existing = ty.sql_type(),
            found = scalar.scalar_type().sql_type(),
            "conflicting scalar type, column left as is"
          ),
          Existing::Scalar(_) | Existing::Reserved => {
            debug!(table, column = %key, "column already exists");
          }
        },

        Shape::Object(nested) => {
          self.note_relational(table, &key, &existing);
          self.ensure_child(table, &key, RelationKind::for_object(self.simple))?;
          self.parse_object(&key, nested)?;
        }

        Shape::List(entries) => {
          self.note_relational(table, &key, &existing);
          self.ensure_child(table, &key, RelationKind::for_list(self.simple))?;
          for entry in &entries {
            self.parse_object(&key, entry)?;
          }
        }
      }
    }
    Ok(())
  }

  fn existing(&self, table: &str, key: &str) -> Result<Existing> {
    let def = self
      .catalog
      .table(table)
      .ok_or_else(|| Error::UnknownTable(table.to_owned()))?;
    Ok(match def.column(key) {
      Some(column) => Existing::Scalar(column.ty),
      None if def.has_column(key) => Existing::Reserved,
      None => Existing::Nothing,
    })
  }

  fn note_relational(&self, table: &str, key: &str, existing: &Existing) {
    if !matches!(existing, Existing::Nothing) {
      debug!(table, column = key, "column holds nested data here, storing it in table {key}");
    }
  }

  /// Create table `key` below `parent` unless a table of that name exists
  /// anywhere; an existing table is reused untouched.
  fn ensure_child(&mut self, parent: &str, key: &str, kind: RelationKind) -> Result<()> {
    if self.catalog.contains(key) {
      trace!(table = key, parent, "reusing existing table");
      return Ok(());
    }

    info!(table = key, parent, ?kind, "creating table");
    let child = if kind.uses_bridge() {
      TableDef::new(key)
    } else {
      TableDef::child_of(key, parent)
    };
    self.create_table(child)?;

    if kind.uses_bridge() {
      let bridge = TableDef::bridge(parent, key);
      if !self.catalog.contains(&bridge.name) {
        info!(table = %bridge.name, parent, child = key, "creating bridge table");
        self.create_table(bridge)?;
      }
    }
    Ok(())
  }

  fn create_table(&mut self, table: TableDef) -> Result<()> {
    self.writer.create_table(&table).map_err(Error::backend)?;
    self.catalog.insert(table);
    self.changed = true;
    Ok(())
  }

  fn add_column(&mut self, table: &str, column: ColumnDef) -> Result<()> {
    self.writer.add_column(table, &column).map_err(Error::backend)?;
    info!(table, column = %column.name, ty = column.ty.sql_type(), "added column");
    self
      .catalog
      .table_mut(table)
      .ok_or_else(|| Error::UnknownTable(table.to_owned()))?
      .columns
      .push(column);
    self.changed = true;
    Ok(())
  }
}
