//! [`SqlWriter`]: the synchronous SQLite implementation of the core writer
//! traits.

use rusqlite::{Connection, params_from_iter, types::Value as SqlValue};
use sqlthemall_core::{
  ColumnDef, RowWriter, SchemaWriter, TableDef,
  catalog::PRIMARY_KEY,
  shape::Scalar,
};
use tracing::trace;

use crate::{
  encode::encode_scalar,
  schema::{self, quote_ident},
};

/// Runs schema and row writes on a borrowed connection (or transaction).
pub struct SqlWriter<'c> {
  conn: &'c Connection,
}

impl<'c> SqlWriter<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn execute(&self, sql: &str, params: Vec<SqlValue>) -> rusqlite::Result<usize> {
    trace!(%sql, ?params, "execute");
    self.conn.execute(sql, params_from_iter(params))
  }
}

impl SchemaWriter for SqlWriter<'_> {
  type Error = rusqlite::Error;

  fn create_table(&mut self, table: &TableDef) -> Result<(), Self::Error> {
    self.execute(&schema::create_table(table), vec![])?;
    Ok(())
  }

  fn add_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), Self::Error> {
    self.execute(&schema::add_column(table, column), vec![])?;
    Ok(())
  }
}

impl RowWriter for SqlWriter<'_> {
  type Error = rusqlite::Error;

  fn find_row(
    &mut self,
    table: &str,
    scalars: &[(String, Scalar)],
  ) -> Result<Option<i64>, Self::Error> {
    let conds: Vec<String> = scalars
      .iter()
      .enumerate()
      .map(|(i, (column, _))| format!("{} = ?{}", quote_ident(column), i + 1))
      .collect();
    let sql = format!(
      "SELECT {pk} FROM {table} WHERE {conds} ORDER BY {pk} LIMIT 1",
      pk = quote_ident(PRIMARY_KEY),
      table = quote_ident(table),
      conds = if conds.is_empty() { "1".to_owned() } else { conds.join(" AND ") },
    );
    let params: Vec<SqlValue> = scalars.iter().map(|(_, v)| encode_scalar(v)).collect();
    trace!(%sql, ?params, "query");

    let mut stmt = self.conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    match rows.next()? {
      Some(row) => Ok(Some(row.get(0)?)),
      None => Ok(None),
    }
  }

  fn insert_row(
    &mut self,
    table: &str,
    scalars: &[(String, Scalar)],
    parent: Option<(&str, i64)>,
  ) -> Result<i64, Self::Error> {
    let mut columns: Vec<String> = scalars.iter().map(|(c, _)| quote_ident(c)).collect();
    let mut params: Vec<SqlValue> = scalars.iter().map(|(_, v)| encode_scalar(v)).collect();
    if let Some((column, parent_id)) = parent {
      columns.push(quote_ident(column));
      params.push(SqlValue::Integer(parent_id));
    }

    let sql = if columns.is_empty() {
      format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table))
    } else {
      let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
      format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", "),
      )
    };
    self.execute(&sql, params)?;
    Ok(self.conn.last_insert_rowid())
  }

  fn set_parent(
    &mut self,
    table: &str,
    row_id: i64,
    column: &str,
    parent_id: i64,
  ) -> Result<(), Self::Error> {
    let sql = format!(
      "UPDATE {} SET {} = ?1 WHERE {} = ?2",
      quote_ident(table),
      quote_ident(column),
      quote_ident(PRIMARY_KEY),
    );
    self.execute(&sql, vec![SqlValue::Integer(parent_id), SqlValue::Integer(row_id)])?;
    Ok(())
  }

  fn link_bridge(
    &mut self,
    bridge: &str,
    parent: (&str, i64),
    child: (&str, i64),
  ) -> Result<bool, Self::Error> {
    let (parent_col, child_col) = (quote_ident(parent.0), quote_ident(child.0));
    let sql = format!(
      "INSERT INTO {bridge} ({parent_col}, {child_col})
       SELECT ?1, ?2
       WHERE NOT EXISTS (
         SELECT 1 FROM {bridge} WHERE {parent_col} = ?1 AND {child_col} = ?2
       )",
      bridge = quote_ident(bridge),
    );
    let changed =
      self.execute(&sql, vec![SqlValue::Integer(parent.1), SqlValue::Integer(child.1)])?;
    Ok(changed > 0)
  }
}
