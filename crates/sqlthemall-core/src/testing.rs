//! In-memory writers for exercising the walks without a database.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
  catalog::{ColumnDef, TableDef},
  shape::Scalar,
  writer::{RowWriter, SchemaWriter},
};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MemoryError(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
  pub id:      i64,
  pub values:  Vec<(String, Scalar)>,
  pub parents: BTreeMap<String, i64>,
}

#[derive(Debug, Default)]
pub struct MemoryDb {
  /// Every DDL operation, in order.
  pub ddl:       Vec<String>,
  pub rows:      BTreeMap<String, Vec<MemoryRow>>,
  pub bridges:   Vec<(String, i64, i64)>,
  /// Fail any DDL touching a table or column of this name.
  pub fail_on:   Option<String>,
  /// Make every dedup lookup error out.
  pub fail_find: bool,
  /// Fail any row insert into this table.
  pub fail_row:  Option<String>,
  pub next_id:   i64,
}

impl MemoryDb {
  pub fn rows(&self, table: &str) -> &[MemoryRow] {
    self.rows.get(table).map(Vec::as_slice).unwrap_or_default()
  }

  fn check(&self, name: &str) -> Result<(), MemoryError> {
    match &self.fail_on {
      Some(bad) if bad == name => Err(MemoryError(format!("refusing to create {name}"))),
      _ => Ok(()),
    }
  }
}

impl SchemaWriter for MemoryDb {
  type Error = MemoryError;

  fn create_table(&mut self, table: &TableDef) -> Result<(), Self::Error> {
    self.check(&table.name)?;
    self.ddl.push(format!("create {}", table.name));
    Ok(())
  }

  fn add_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), Self::Error> {
    self.check(&column.name)?;
    self.ddl.push(format!("add {table}.{}", column.name));
    Ok(())
  }
}

impl RowWriter for MemoryDb {
  type Error = MemoryError;

  fn find_row(
    &mut self,
    table: &str,
    scalars: &[(String, Scalar)],
  ) -> Result<Option<i64>, Self::Error> {
    if self.fail_find {
      return Err(MemoryError("lookup failed".into()));
    }
    Ok(
      self
        .rows(table)
        .iter()
        .find(|row| scalars.iter().all(|pair| row.values.contains(pair)))
        .map(|row| row.id),
    )
  }

  fn insert_row(
    &mut self,
    table: &str,
    scalars: &[(String, Scalar)],
    parent: Option<(&str, i64)>,
  ) -> Result<i64, Self::Error> {
    if self.fail_row.as_deref() == Some(table) {
      return Err(MemoryError(format!("refusing to insert into {table}")));
    }
    self.next_id += 1;
    let row = MemoryRow {
      id:      self.next_id,
      values:  scalars.to_vec(),
      parents: parent.map(|(c, id)| (c.to_owned(), id)).into_iter().collect(),
    };
    self.rows.entry(table.to_owned()).or_default().push(row);
    Ok(self.next_id)
  }

  fn set_parent(
    &mut self,
    table: &str,
    row_id: i64,
    column: &str,
    parent_id: i64,
  ) -> Result<(), Self::Error> {
    let row = self
      .rows
      .get_mut(table)
      .and_then(|rows| rows.iter_mut().find(|r| r.id == row_id))
      .ok_or_else(|| MemoryError(format!("no row {row_id} in {table}")))?;
    row.parents.insert(column.to_owned(), parent_id);
    Ok(())
  }

  fn link_bridge(
    &mut self,
    bridge: &str,
    parent: (&str, i64),
    child: (&str, i64),
  ) -> Result<bool, Self::Error> {
    let link = (bridge.to_owned(), parent.1, child.1);
    if self.bridges.contains(&link) {
      return Ok(false);
    }
    self.bridges.push(link);
    Ok(true)
  }
}
