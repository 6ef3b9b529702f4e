//! Object mapping: turn a document into rows bound to the current catalog,
//! then write them.
//!
//! Mapping is split in two. [`map_document`] is pure and builds the whole
//! [`Row`] tree first, so children are complete before their parent is
//! finalized. [`persist`] then writes the tree top-down through a
//! [`RowWriter`], looking up duplicates and linking children to parents.
//!
//! An object that ends up with no scalar fields produces no row. Its child
//! rows are kept as *detached* rows: they are written on their own, without a
//! parent link. This is also how the `{root: [...]}` wrapper of a batch
//! import stores its elements.

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
  Error, Result,
  catalog::{Catalog, Link},
  row::Row,
  shape::{self, Object, Shape},
  writer::RowWriter,
};

// ─── Mapping ─────────────────────────────────────────────────────────────────

/// The rows built from one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapped {
  /// The root row, if the top-level object carried any scalar data.
  pub root:     Option<Row>,
  /// Rows whose parent object produced no row.
  pub detached: Vec<Row>,
}

impl Mapped {
  pub fn is_empty(&self) -> bool { self.root.is_none() && self.detached.is_empty() }

  /// All top-level rows: the root first, then detached rows.
  pub fn top_level(&self) -> impl Iterator<Item = &Row> {
    self.root.iter().chain(self.detached.iter())
  }
}

/// Build the rows for `value` under `root_table`.
///
/// Fields whose key has no column in the target table (for instance because
/// the table is shared with a differently-shaped key elsewhere) are dropped.
pub fn map_document(catalog: &Catalog, root_table: &str, value: &Value) -> Result<Mapped> {
  let root_table = root_table.to_lowercase();
  let root = shape::root_object(&root_table, value)?;
  if !catalog.contains(&root_table) {
    return Err(Error::UnknownTable(root_table));
  }

  let mut mapper = RowMapper { catalog, detached: vec![] };
  let root = mapper.make_row(&root_table, &root);
  Ok(Mapped { root, detached: mapper.detached })
}

struct RowMapper<'a> {
  catalog:  &'a Catalog,
  detached: Vec<Row>,
}

impl RowMapper<'_> {
  fn make_row(&mut self, table: &str, obj: &Object) -> Option<Row> {
    let catalog = self.catalog;
    let Some(def) = catalog.table(table) else {
      debug!(table, "no such table, skipping nested data");
      return None;
    };

    let mut row = Row::new(table);
    for (key, value) in shape::fields(obj) {
      match shape::classify(value) {
        Shape::Empty => {}
        Shape::Scalar(scalar) => {
          if def.column(&key).is_some() {
            row.scalars.push((key, scalar));
          } else {
            debug!(table, column = %key, "no scalar column for field, dropped");
          }
        }
        Shape::Object(nested) => {
          if let Some(child) = self.make_row(&key, nested) {
            row.attach(child);
          }
        }
        Shape::List(entries) => {
          for entry in &entries {
            if let Some(child) = self.make_row(&key, entry) {
              row.attach(child);
            }
          }
        }
      }
    }

    if row.scalars.is_empty() {
      trace!(table, "object has no scalar fields, no row");
      self
        .detached
        .extend(row.children.into_iter().flat_map(|c| c.rows));
      return None;
    }
    Some(row)
  }
}

// ─── Persistence ─────────────────────────────────────────────────────────────

/// Counters for one [`persist`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
  pub inserted: usize,
  /// Rows matched to an existing row by the dedup lookup.
  pub reused:   usize,
  /// Bridge rows added.
  pub linked:   usize,
  /// Rows written without a parent link.
  pub detached: usize,
}

impl InsertStats {
  pub fn rows(&self) -> usize { self.inserted + self.reused }
}

impl std::ops::AddAssign for InsertStats {
  fn add_assign(&mut self, other: Self) {
    self.inserted += other.inserted;
    self.reused += other.reused;
    self.linked += other.linked;
    self.detached += other.detached;
  }
}

/// Write `mapped` through `writer`.
///
/// With `dedup`, each row is first looked up by exact match on its scalar
/// fields and an existing row is reused instead of inserting a new one. A
/// failing lookup counts as no match. Any other writer error aborts; the
/// caller owns the transaction and must roll it back.
pub fn persist<W: RowWriter>(
  writer: &mut W,
  catalog: &Catalog,
  mapped: &Mapped,
  dedup: bool,
) -> Result<InsertStats> {
  let mut persister = Persister { writer, catalog, dedup, stats: InsertStats::default() };
  if let Some(root) = &mapped.root {
    persister.write(root, None)?;
  }
  for row in &mapped.detached {
    persister.stats.detached += 1;
    persister.write(row, None)?;
  }
  Ok(persister.stats)
}

struct Persister<'a, W> {
  writer:  &'a mut W,
  catalog: &'a Catalog,
  dedup:   bool,
  stats:   InsertStats,
}

impl<W: RowWriter> Persister<'_, W> {
  /// Write `row` (and everything below it) and return its `_id`.
  fn write(&mut self, row: &Row, parent: Option<(&str, i64)>) -> Result<i64> {
    let link = parent.and_then(|(table, _)| self.catalog.link(table, &row.table));
    if let (Some((parent_table, _)), None) = (parent, &link) {
      warn!(
        table = %row.table,
        parent = parent_table,
        "no relationship between tables, row stored unlinked"
      );
      self.stats.detached += 1;
    }

    let child_key = match (&link, parent) {
      (Some(Link::ChildKey { column }), Some((_, parent_id))) => Some((column.as_str(), parent_id)),
      _ => None,
    };

    let id = match self.lookup(row) {
      Some(id) => {
        self.stats.reused += 1;
        if let Some((column, parent_id)) = child_key {
          self
            .writer
            .set_parent(&row.table, id, column, parent_id)
            .map_err(Error::backend)?;
        }
        id
      }
      None => {
        self.stats.inserted += 1;
        self
          .writer
          .insert_row(&row.table, &row.scalars, child_key)
          .map_err(Error::backend)?
      }
    };

    if let (
      Some(Link::Bridge { table, parent_column, child_column }),
      Some((_, parent_id)),
    ) = (&link, parent)
      && self
        .writer
        .link_bridge(table, (parent_column.as_str(), parent_id), (child_column.as_str(), id))
        .map_err(Error::backend)?
    {
      self.stats.linked += 1;
    }

    for collection in &row.children {
      for child in &collection.rows {
        self.write(child, Some((row.table.as_str(), id)))?;
      }
    }
    Ok(id)
  }

  fn lookup(&mut self, row: &Row) -> Option<i64> {
    if !self.dedup {
      return None;
    }
    match self.writer.find_row(&row.table, &row.scalars) {
      Ok(Some(id)) => {
        debug!(table = %row.table, id, "reusing existing row");
        Some(id)
      }
      Ok(None) => None,
      Err(err) => {
        debug!(table = %row.table, error = %err, "dedup lookup failed, inserting");
        None
      }
    }
  }
}
