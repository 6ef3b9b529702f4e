//! Read imported documents back out of the database.
//!
//! The inverse of the mapper, as far as the schema allows: every nested table
//! comes back as a list, booleans are restored from the declared column type,
//! and a wrapped scalar (`{"value": x}` and nothing else) is unwrapped. Key
//! columns and NULLs are left out.

use rusqlite::{Connection, params};
use serde_json::{Map, Value};
use sqlthemall_core::{Catalog, Link, catalog::{PRIMARY_KEY, VALUE_COLUMN}};
use tracing::trace;

use crate::{Error, Result, encode::decode_value, schema::quote_ident};

/// One document per row of `root_table`, in insertion order.
pub fn export_documents(
  conn: &Connection,
  catalog: &Catalog,
  root_table: &str,
) -> Result<Vec<Value>> {
  let root_table = root_table.to_lowercase();
  if !catalog.contains(&root_table) {
    return Err(Error::RootTableMissing(root_table));
  }

  let exporter = Exporter { conn, catalog };
  let sql = format!(
    "SELECT {pk} FROM {table} ORDER BY {pk}",
    pk = quote_ident(PRIMARY_KEY),
    table = quote_ident(&root_table),
  );
  let mut path = vec![root_table.clone()];
  exporter
    .ids(&sql, None)?
    .into_iter()
    .map(|id| exporter.object(&root_table, id, &mut path).map(Value::Object))
    .collect()
}

struct Exporter<'a> {
  conn:    &'a Connection,
  catalog: &'a Catalog,
}

impl Exporter<'_> {
  fn ids(&self, sql: &str, parent: Option<i64>) -> Result<Vec<i64>> {
    trace!(%sql, ?parent, "query");
    let mut stmt = self.conn.prepare(sql)?;
    let ids: rusqlite::Result<Vec<i64>> = match parent {
      Some(id) => stmt.query_map(params![id], |row| row.get(0))?.collect(),
      None => stmt.query_map([], |row| row.get(0))?.collect(),
    };
    Ok(ids?)
  }

  /// The row `id` of `table` with everything linked below it. `path` holds
  /// the tables being expanded, so self-referencing schemas terminate.
  fn object(&self, table: &str, id: i64, path: &mut Vec<String>) -> Result<Map<String, Value>> {
    let mut object = Map::new();

    if let Some(def) = self.catalog.table(table)
      && !def.columns.is_empty()
    {
      let columns: Vec<String> = def.columns.iter().map(|c| quote_ident(&c.name)).collect();
      let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        columns.join(", "),
        quote_ident(table),
        quote_ident(PRIMARY_KEY),
      );
      trace!(%sql, id, "query");
      self.conn.query_row(&sql, params![id], |row| {
        for (i, column) in def.columns.iter().enumerate() {
          if let Some(value) = decode_value(row.get_ref(i)?, Some(column.ty)) {
            object.insert(column.name.clone(), value);
          }
        }
        Ok(())
      })?;
    }

    for (child, link) in self.catalog.children_of(table) {
      if path.contains(&child) {
        continue;
      }
      let sql = match &link {
        Link::ChildKey { column } => format!(
          "SELECT {pk} FROM {child} WHERE {column} = ?1 ORDER BY {pk}",
          pk = quote_ident(PRIMARY_KEY),
          child = quote_ident(&child),
          column = quote_ident(column),
        ),
        Link::Bridge { table, parent_column, child_column } => format!(
          "SELECT {} FROM {} WHERE {} = ?1 ORDER BY rowid",
          quote_ident(child_column),
          quote_ident(table),
          quote_ident(parent_column),
        ),
      };

      path.push(child.clone());
      let mut items = Vec::new();
      for child_id in self.ids(&sql, Some(id))? {
        items.push(unwrap_value(self.object(&child, child_id, path)?));
      }
      path.pop();

      if !items.is_empty() {
        object.insert(child, Value::Array(items));
      }
    }

    Ok(object)
  }
}

fn unwrap_value(mut object: Map<String, Value>) -> Value {
  if object.len() == 1
    && let Some(value) = object.remove(VALUE_COLUMN)
  {
    return value;
  }
  Value::Object(object)
}
