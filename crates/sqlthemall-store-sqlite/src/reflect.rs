//! Build a [`Catalog`] from the live database.

use rusqlite::Connection;
use sqlthemall_core::{
  Catalog, ColumnDef, ForeignKey, ScalarType, TableDef,
  catalog::PRIMARY_KEY,
};
use tracing::debug;

use crate::{Result, schema::quote_ident};

/// Raw `PRAGMA table_info` row.
struct RawColumn {
  name:     String,
  declared: String,
  pk:       bool,
}

/// Read every user table with its columns and foreign keys.
///
/// Columns that are neither `_id` nor a foreign key become scalar columns.
/// Declared types the importer does not know are read as strings.
pub fn reflect(conn: &Connection) -> Result<Catalog> {
  let names: Vec<String> = conn
    .prepare(
      "SELECT name FROM sqlite_master
       WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
       ORDER BY name",
    )?
    .query_map([], |row| row.get(0))?
    .collect::<rusqlite::Result<_>>()?;

  let mut catalog = Catalog::new();
  for name in names {
    catalog.insert(reflect_table(conn, &name)?);
  }
  Ok(catalog)
}

fn reflect_table(conn: &Connection, name: &str) -> Result<TableDef> {
  let quoted = quote_ident(name);

  let columns: Vec<RawColumn> = conn
    .prepare(&format!("PRAGMA table_info({quoted})"))?
    .query_map([], |row| {
      Ok(RawColumn {
        name:     row.get::<_, String>(1)?.to_lowercase(),
        declared: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        pk:       row.get::<_, i64>(5)? > 0,
      })
    })?
    .collect::<rusqlite::Result<_>>()?;

  let foreign_keys: Vec<ForeignKey> = conn
    .prepare(&format!("PRAGMA foreign_key_list({quoted})"))?
    .query_map([], |row| {
      Ok(ForeignKey {
        references: row.get::<_, String>(2)?.to_lowercase(),
        column:     row.get::<_, String>(3)?.to_lowercase(),
      })
    })?
    .collect::<rusqlite::Result<_>>()?;

  // SQLite lists foreign keys last-declared first.
  let foreign_keys: Vec<ForeignKey> = foreign_keys.into_iter().rev().collect();

  let mut table = TableDef::new(name.to_lowercase());
  table.primary_key = columns.iter().any(|c| c.pk && c.name == PRIMARY_KEY);
  for column in columns {
    if column.name == PRIMARY_KEY || foreign_keys.iter().any(|fk| fk.column == column.name) {
      continue;
    }
    let ty = ScalarType::from_sql_type(&column.declared).unwrap_or_else(|| {
      debug!(table = name, column = %column.name, declared = %column.declared, "unknown column type, reading as string");
      ScalarType::String
    });
    table.columns.push(ColumnDef::new(column.name, ty));
  }
  table.foreign_keys = foreign_keys;
  Ok(table)
}
