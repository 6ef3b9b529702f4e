//! Conversions between importer values and SQLite values.
//!
//! Booleans are stored as 0/1 integers and dates as `YYYY-MM-DD` text; the
//! declared column type is what tells them apart on the way back out.

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value;
use sqlthemall_core::{ScalarType, shape::{DATE_FORMAT, Scalar}};

pub fn encode_scalar(scalar: &Scalar) -> SqlValue {
  match scalar {
    Scalar::String(s) => SqlValue::Text(s.clone()),
    Scalar::Integer(i) => SqlValue::Integer(*i),
    Scalar::Float(f) => SqlValue::Real(*f),
    Scalar::Boolean(b) => SqlValue::Integer(i64::from(*b)),
    Scalar::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
  }
}

/// Decode a stored value for a column declared as `ty`. `None` for NULL.
///
/// The storage class wins over the declared type, since a column can hold a
/// value of another type written by an earlier, conflicting document.
pub fn decode_value(value: ValueRef<'_>, ty: Option<ScalarType>) -> Option<Value> {
  match value {
    ValueRef::Null => None,
    ValueRef::Integer(i) if ty == Some(ScalarType::Boolean) => Some(Value::Bool(i != 0)),
    ValueRef::Integer(i) => Some(Value::from(i)),
    ValueRef::Real(f) => Some(Value::from(f)),
    ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
      Some(Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }
  }
}
