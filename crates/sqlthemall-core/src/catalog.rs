//! The schema catalog: tables, columns and the relationships between them.
//!
//! The catalog is an in-memory mirror of the physical schema. It is reflected
//! from the database by the backend, mutated by the inference walk as tables
//! and columns are created, and re-reflected after every schema change.

use std::collections::BTreeMap;

/// Synthetic primary key carried by every non-bridge table.
pub const PRIMARY_KEY: &str = "_id";

/// Column holding a wrapped non-object list element.
pub const VALUE_COLUMN: &str = "value";

pub const BRIDGE_PREFIX: &str = "bridge_";

/// Foreign key column name pointing at `table`.
pub fn fk_column(table: &str) -> String { format!("{table}{PRIMARY_KEY}") }

/// Name of the junction table linking `parent` to `child`.
pub fn bridge_name(parent: &str, child: &str) -> String {
  format!("{BRIDGE_PREFIX}{parent}_{child}")
}

// ─── Types ───────────────────────────────────────────────────────────────────

/// The scalar column types the importer creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
  String,
  Integer,
  Float,
  Boolean,
  Date,
}

impl ScalarType {
  /// Declared SQL type used in DDL.
  pub fn sql_type(self) -> &'static str {
    match self {
      Self::String => "VARCHAR",
      Self::Integer => "INTEGER",
      Self::Float => "FLOAT",
      Self::Boolean => "BOOLEAN",
      Self::Date => "DATE",
    }
  }

  /// Map a declared column type (as reflected) back to a scalar type.
  ///
  /// Follows SQLite's substring rules loosely; `BOOL` and `DATE` are checked
  /// before `INT` so that `BOOLEAN` and `DATETIME` are not read as integers.
  pub fn from_sql_type(declared: &str) -> Option<Self> {
    let decl = declared.to_ascii_uppercase();
    if decl.contains("BOOL") {
      Some(Self::Boolean)
    } else if decl.contains("DATE") {
      Some(Self::Date)
    } else if decl.contains("INT") {
      Some(Self::Integer)
    } else if decl.contains("CHAR") || decl.contains("TEXT") || decl.contains("CLOB") {
      Some(Self::String)
    } else if decl.contains("REAL")
      || decl.contains("FLOA")
      || decl.contains("DOUB")
      || decl.contains("NUMERIC")
      || decl.contains("DECIMAL")
    {
      Some(Self::Float)
    } else {
      None
    }
  }
}

/// A scalar column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
  pub name: String,
  pub ty:   ScalarType,
}

impl ColumnDef {
  pub fn new(name: impl Into<String>, ty: ScalarType) -> Self {
    Self { name: name.into(), ty }
  }
}

/// `column` references `references._id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
  pub column:     String,
  pub references: String,
}

impl ForeignKey {
  /// The conventional `<parent>_id` key pointing at `parent`.
  pub fn to_parent(parent: &str) -> Self {
    Self { column: fk_column(parent), references: parent.to_owned() }
  }
}

/// A table as known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
  pub name:         String,
  /// Whether the table carries the synthetic `_id` key. Bridges do not.
  pub primary_key:  bool,
  /// Scalar columns in creation order.
  pub columns:      Vec<ColumnDef>,
  pub foreign_keys: Vec<ForeignKey>,
}

impl TableDef {
  /// A table holding only the `_id` primary key.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:         name.into(),
      primary_key:  true,
      columns:      vec![],
      foreign_keys: vec![],
    }
  }

  /// A table whose rows point at `parent` through `<parent>_id`.
  pub fn child_of(name: impl Into<String>, parent: &str) -> Self {
    let mut table = Self::new(name);
    table.foreign_keys.push(ForeignKey::to_parent(parent));
    table
  }

  /// The junction table `bridge_<parent>_<child>`.
  pub fn bridge(parent: &str, child: &str) -> Self {
    Self {
      name:         bridge_name(parent, child),
      primary_key:  false,
      columns:      vec![],
      foreign_keys: vec![ForeignKey::to_parent(parent), ForeignKey::to_parent(child)],
    }
  }

  /// Look up a scalar column.
  pub fn column(&self, name: &str) -> Option<&ColumnDef> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
    self.foreign_keys.iter().find(|fk| fk.column == column)
  }

  /// True for any physical column: `_id`, scalar or foreign key.
  pub fn has_column(&self, name: &str) -> bool {
    (self.primary_key && name == PRIMARY_KEY)
      || self.column(name).is_some()
      || self.foreign_key(name).is_some()
  }

  pub fn is_bridge(&self) -> bool {
    !self.primary_key
      && self.name.starts_with(BRIDGE_PREFIX)
      && self.foreign_keys.len() == 2
  }

  /// The child's conventional key pointing at `parent`, if present.
  fn parent_key(&self, parent: &str) -> Option<&ForeignKey> {
    self
      .foreign_keys
      .iter()
      .find(|fk| fk.references == parent && fk.column == fk_column(parent))
  }
}

// ─── Relationships ───────────────────────────────────────────────────────────

/// The relationship policy applied when a nested key creates a new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
  /// Nested object, default mode: child carries `<parent>_id`.
  ManyToOne,
  /// Nested object, simple mode: same shape as [`Self::ManyToOne`].
  OneToOne,
  /// List, default mode: plain child table plus a bridge table.
  ManyToMany,
  /// List, simple mode: child carries `<parent>_id`, no bridge.
  OneToMany,
}

impl RelationKind {
  pub fn for_object(simple: bool) -> Self {
    if simple { Self::OneToOne } else { Self::ManyToOne }
  }

  pub fn for_list(simple: bool) -> Self {
    if simple { Self::OneToMany } else { Self::ManyToMany }
  }

  pub fn uses_bridge(self) -> bool { matches!(self, Self::ManyToMany) }
}

/// How rows of a child table are physically linked to a parent row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
  /// The child row's `column` holds the parent `_id`.
  ChildKey { column: String },
  /// A junction row `(parent_column, child_column)` in `table`.
  Bridge {
    table:         String,
    parent_column: String,
    child_column:  String,
  },
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// All known tables, keyed by lower-cased name.
///
/// Owned by exactly one importer. Nothing synchronizes two catalogs over the
/// same database; concurrent importers will diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
  tables: BTreeMap<String, TableDef>,
}

impl Catalog {
  pub fn new() -> Self { Self::default() }

  pub fn from_tables(tables: impl IntoIterator<Item = TableDef>) -> Self {
    let mut catalog = Self::new();
    for table in tables {
      catalog.insert(table);
    }
    catalog
  }

  pub fn table(&self, name: &str) -> Option<&TableDef> { self.tables.get(name) }

  pub fn table_mut(&mut self, name: &str) -> Option<&mut TableDef> {
    self.tables.get_mut(name)
  }

  pub fn contains(&self, name: &str) -> bool { self.tables.contains_key(name) }

  /// Add or replace a table definition.
  pub fn insert(&mut self, table: TableDef) {
    self.tables.insert(table.name.to_lowercase(), table);
  }

  /// Tables in name order.
  pub fn tables(&self) -> impl Iterator<Item = &TableDef> { self.tables.values() }

  pub fn len(&self) -> usize { self.tables.len() }

  pub fn is_empty(&self) -> bool { self.tables.is_empty() }

  /// Resolve how rows of `child` attach to rows of `parent`.
  ///
  /// A direct `<parent>_id` key on the child wins over a bridge table. `None`
  /// means the two tables were never related, which happens when a table is
  /// reused by a key under a different parent.
  pub fn link(&self, parent: &str, child: &str) -> Option<Link> {
    let child_def = self.table(child)?;
    if child != parent
      && let Some(fk) = child_def.parent_key(parent)
    {
      return Some(Link::ChildKey { column: fk.column.clone() });
    }

    let bridge = self.table(&bridge_name(parent, child))?;
    if !bridge.is_bridge() {
      return None;
    }
    let parent_fk = bridge.parent_key(parent)?;
    let child_fk = bridge.parent_key(child)?;
    if parent_fk.column == child_fk.column {
      return None;
    }
    Some(Link::Bridge {
      table:         bridge.name.clone(),
      parent_column: parent_fk.column.clone(),
      child_column:  child_fk.column.clone(),
    })
  }

  /// Every table linked below `parent`, with the link used to reach it.
  pub fn children_of(&self, parent: &str) -> Vec<(String, Link)> {
    let mut children = Vec::new();
    for table in self.tables() {
      if table.name == parent {
        continue;
      }
      if table.is_bridge() {
        let prefix = format!("{BRIDGE_PREFIX}{parent}_");
        let Some(child) = table.name.strip_prefix(&prefix) else {
          continue;
        };
        if let Some(link @ Link::Bridge { .. }) = self.link(parent, child) {
          children.push((child.to_owned(), link));
        }
      } else if let Some(fk) = table.parent_key(parent) {
        children.push((table.name.clone(), Link::ChildKey { column: fk.column.clone() }));
      }
    }
    children
  }
}
