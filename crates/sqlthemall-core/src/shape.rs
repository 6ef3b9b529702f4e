//! Classification of JSON values into the shapes the importer cares about.
//!
//! Both the inference walk and the object mapper go through this module, so
//! key folding, `_id` renaming, empty pruning and scalar wrapping behave
//! identically in the two passes.

use std::{borrow::Cow, collections::HashSet};

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  catalog::{PRIMARY_KEY, ScalarType, VALUE_COLUMN},
};

/// A JSON object as walked by the importer.
pub type Object = Map<String, Value>;

// ─── Scalars ─────────────────────────────────────────────────────────────────

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
  String(String),
  Integer(i64),
  Float(f64),
  Boolean(bool),
  /// A string of the exact form `YYYY-MM-DD`.
  Date(NaiveDate),
}

impl Scalar {
  /// Classify a JSON leaf. Returns `None` for null, arrays and objects.
  pub fn from_json(value: &Value) -> Option<Self> {
    match value {
      Value::Bool(b) => Some(Self::Boolean(*b)),
      Value::Number(n) => match n.as_i64() {
        Some(i) => Some(Self::Integer(i)),
        None => n.as_f64().map(Self::Float),
      },
      Value::String(s) => Some(parse_date(s).map_or_else(|| Self::String(s.clone()), Self::Date)),
      Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
  }

  pub fn scalar_type(&self) -> ScalarType {
    match self {
      Self::String(_) => ScalarType::String,
      Self::Integer(_) => ScalarType::Integer,
      Self::Float(_) => ScalarType::Float,
      Self::Boolean(_) => ScalarType::Boolean,
      Self::Date(_) => ScalarType::Date,
    }
  }

  /// Back to JSON. Dates become their `YYYY-MM-DD` string.
  pub fn to_json(&self) -> Value {
    match self {
      Self::String(s) => Value::String(s.clone()),
      Self::Integer(i) => Value::from(*i),
      Self::Float(f) => Value::from(*f),
      Self::Boolean(b) => Value::Bool(*b),
      Self::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
    }
  }
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(s: &str) -> Option<NaiveDate> {
  if s.len() != 10 {
    return None;
  }
  NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

// ─── Shapes ──────────────────────────────────────────────────────────────────

/// What a field value means to the importer.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape<'a> {
  /// Null, `[]`, `{}` or a list with nothing but such entries. Never creates
  /// schema and never produces a row or a column value.
  Empty,
  Scalar(Scalar),
  /// A non-empty nested object.
  Object(&'a Object),
  /// The surviving entries of a list; non-object entries are wrapped as
  /// `{"value": entry}`.
  List(Vec<Cow<'a, Object>>),
}

pub fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Array(items) => items.iter().all(is_empty),
    Value::Object(map) => map.is_empty(),
    Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
  }
}

pub fn classify(value: &Value) -> Shape<'_> {
  match value {
    Value::Null => Shape::Empty,
    Value::Object(map) if map.is_empty() => Shape::Empty,
    Value::Object(map) => Shape::Object(map),
    Value::Array(items) => {
      let entries: Vec<Cow<'_, Object>> = items
        .iter()
        .filter(|item| !is_empty(item))
        .map(|item| match item {
          Value::Object(map) => Cow::Borrowed(map),
          other => Cow::Owned(wrap_scalar(other.clone())),
        })
        .collect();
      if entries.is_empty() { Shape::Empty } else { Shape::List(entries) }
    }
    Value::Bool(_) | Value::Number(_) | Value::String(_) => {
      Scalar::from_json(value).map_or(Shape::Empty, Shape::Scalar)
    }
  }
}

/// `{"value": item}`.
pub fn wrap_scalar(item: Value) -> Object {
  let mut map = Object::new();
  map.insert(VALUE_COLUMN.to_owned(), item);
  map
}

/// The fields of `obj` as the importer sees them: keys lower-cased, `_id`
/// renamed to `id`, empty keys dropped. When two keys fold to the same name
/// the first one wins.
pub fn fields(obj: &Object) -> Vec<(String, &Value)> {
  let mut seen = HashSet::new();
  let mut out = Vec::with_capacity(obj.len());
  for (key, value) in obj {
    let mut folded = key.to_lowercase();
    if folded == PRIMARY_KEY {
      folded = "id".to_owned();
    }
    if folded.is_empty() || !seen.insert(folded.clone()) {
      continue;
    }
    out.push((folded, value));
  }
  out
}

/// The object walked for a top-level value: objects as-is, arrays wrapped as
/// `{root_table: array}`.
pub fn root_object<'a>(root_table: &str, value: &'a Value) -> Result<Cow<'a, Object>> {
  match value {
    Value::Object(map) => Ok(Cow::Borrowed(map)),
    Value::Array(_) => {
      let mut map = Object::new();
      map.insert(root_table.to_owned(), value.clone());
      Ok(Cow::Owned(map))
    }
    Value::Null => Err(Error::InvalidRoot("null")),
    Value::Bool(_) => Err(Error::InvalidRoot("boolean")),
    Value::Number(_) => Err(Error::InvalidRoot("number")),
    Value::String(_) => Err(Error::InvalidRoot("string")),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn scalars_are_typed() {
    assert_eq!(Scalar::from_json(&json!("a")), Some(Scalar::String("a".into())));
    assert_eq!(Scalar::from_json(&json!(3)), Some(Scalar::Integer(3)));
    assert_eq!(Scalar::from_json(&json!(1.5)), Some(Scalar::Float(1.5)));
    assert_eq!(Scalar::from_json(&json!(true)), Some(Scalar::Boolean(true)));
    assert_eq!(
      Scalar::from_json(&json!("2024-02-29")),
      Some(Scalar::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
    );
    assert_eq!(
      Scalar::from_json(&json!("2023-02-29")),
      Some(Scalar::String("2023-02-29".into()))
    );
    assert_eq!(Scalar::from_json(&json!(u64::MAX)), Some(Scalar::Float(u64::MAX as f64)));
    assert_eq!(Scalar::from_json(&json!(null)), None);
  }

  #[test]
  fn empties_are_pruned() {
    assert_eq!(classify(&json!(null)), Shape::Empty);
    assert_eq!(classify(&json!([])), Shape::Empty);
    assert_eq!(classify(&json!({})), Shape::Empty);
    assert_eq!(classify(&json!([null, [], {}, [null]])), Shape::Empty);
  }

  #[test]
  fn list_entries_are_wrapped() {
    let value = json!(["x", null, {"a": 1}]);
    let Shape::List(entries) = classify(&value) else {
      panic!("expected a list");
    };
    assert_eq!(entries.len(), 2);
    assert_eq!(Value::Object(entries[0].clone().into_owned()), json!({"value": "x"}));
    assert_eq!(Value::Object(entries[1].clone().into_owned()), json!({"a": 1}));
  }

  #[test]
  fn fields_fold_keys() {
    let value = json!({"_id": 7, "Name": "a", "": 1, "NAME": "b"});
    let Value::Object(obj) = &value else { unreachable!() };
    let keys: Vec<_> = fields(obj).into_iter().map(|(k, v)| (k, v.clone())).collect();
    assert_eq!(keys, vec![("id".to_owned(), json!(7)), ("name".to_owned(), json!("a"))]);
  }

  #[test]
  fn root_arrays_are_wrapped() {
    let value = json!([1, 2]);
    let root = root_object("main", &value).unwrap();
    assert_eq!(Value::Object(root.into_owned()), json!({"main": [1, 2]}));
    assert!(matches!(root_object("main", &json!(1)), Err(Error::InvalidRoot("number"))));
  }
}
