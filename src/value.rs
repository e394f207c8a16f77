//! Field values - the tagged union flowing between entities, rows and SQL.
//!
//! Coercion rules are exhaustive matches over these variants instead of
//! implicit runtime casts. Datetimes are always `DateTime<Utc>` in memory;
//! they leave the process as `YYYY-MM-DD HH:MM:SS` text on the write path
//! and as ISO-8601 with offset on the JSON output path.

use chrono::{DateTime, Utc};
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};

/// Storage wire format for datetimes (no timezone, UTC by convention)
pub const STORAGE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A dynamically-typed field value held by an [`crate::Entity`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Format a datetime the way it is written to the store
    pub fn storage_datetime(dt: &DateTime<Utc>) -> String {
        dt.format(STORAGE_DATETIME_FORMAT).to_string()
    }

    /// Convert to a JSON value; datetimes render as ISO-8601 with offset
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            // Booleans are stored as integer 1/0
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::DateTime(dt) => ToSqlOutput::Owned(SqlValue::Text(Value::storage_datetime(dt))),
        })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_storage_datetime_format() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 5).unwrap();
        assert_eq!(Value::storage_datetime(&dt), "2024-03-15 09:30:05");
    }

    #[test]
    fn test_json_datetime_is_iso8601_with_offset() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 5).unwrap();
        let json = Value::DateTime(dt).to_json();
        assert_eq!(json, serde_json::json!("2024-03-15T09:30:05+00:00"));
    }

    #[test]
    fn test_bool_binds_as_integer() {
        let out = Value::Bool(true).to_sql().unwrap();
        assert_eq!(out, ToSqlOutput::Owned(SqlValue::Integer(1)));
        let out = Value::Bool(false).to_sql().unwrap();
        assert_eq!(out, ToSqlOutput::Owned(SqlValue::Integer(0)));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
