//! Generic row objects produced by the mapper.

use crate::shape::Scalar;

/// One row to be written, with the rows nested below it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub table:    String,
  /// Column assignments in document order. Never empty.
  pub scalars:  Vec<(String, Scalar)>,
  pub children: Vec<Collection>,
}

/// The child rows built from one nested key.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
  /// The child table, which is also the JSON key.
  pub table: String,
  pub rows:  Vec<Row>,
}

impl Row {
  pub fn new(table: impl Into<String>) -> Self {
    Self { table: table.into(), scalars: vec![], children: vec![] }
  }

  pub fn scalar(&self, column: &str) -> Option<&Scalar> {
    self.scalars.iter().find(|(name, _)| name == column).map(|(_, v)| v)
  }

  /// Append `child` to the collection for its table, creating it on first use.
  pub fn attach(&mut self, child: Row) {
    match self.children.iter_mut().find(|c| c.table == child.table) {
      Some(collection) => collection.rows.push(child),
      None => self.children.push(Collection { table: child.table.clone(), rows: vec![child] }),
    }
  }

  pub fn collection(&self, table: &str) -> Option<&Collection> {
    self.children.iter().find(|c| c.table == table)
  }

  /// Number of rows in this tree, including `self`.
  pub fn tree_size(&self) -> usize {
    1 + self
      .children
      .iter()
      .flat_map(|c| c.rows.iter())
      .map(Row::tree_size)
      .sum::<usize>()
  }
}
