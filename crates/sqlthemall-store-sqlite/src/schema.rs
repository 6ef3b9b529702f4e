//! SQL text for connection setup and schema changes.
//!
//! Identifiers come straight from JSON keys, so every table and column name
//! is double-quoted. Keys such as `order` or `0.1` are valid names this way.

use sqlthemall_core::{
  ColumnDef, TableDef,
  catalog::PRIMARY_KEY,
};

/// Executed once per connection.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

pub fn create_table(table: &TableDef) -> String {
  let mut defs: Vec<String> = vec![];
  if table.primary_key {
    defs.push(format!("{} INTEGER PRIMARY KEY", quote_ident(PRIMARY_KEY)));
  }
  for column in &table.columns {
    defs.push(format!("{} {}", quote_ident(&column.name), column.ty.sql_type()));
  }
  for fk in &table.foreign_keys {
    defs.push(format!("{} INTEGER", quote_ident(&fk.column)));
  }
  for fk in &table.foreign_keys {
    defs.push(format!(
      "FOREIGN KEY ({}) REFERENCES {} ({})",
      quote_ident(&fk.column),
      quote_ident(&fk.references),
      quote_ident(PRIMARY_KEY),
    ));
  }
  format!("CREATE TABLE {} ({})", quote_ident(&table.name), defs.join(", "))
}

pub fn add_column(table: &str, column: &ColumnDef) -> String {
  format!(
    "ALTER TABLE {} ADD COLUMN {} {}",
    quote_ident(table),
    quote_ident(&column.name),
    column.ty.sql_type(),
  )
}
