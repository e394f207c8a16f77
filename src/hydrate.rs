//! Row hydration: raw result rows into entities, in schema order.
//!
//! The coercion matrix is deliberately strict and asymmetric where the
//! store's historical contract is:
//! - booleans are true iff the raw value is integer 1; `0`, `2`, `"true"`
//!   and every other representation hydrate to false
//! - a SQL NULL counts as "absent", so a NULL under a non-nullable
//!   descriptor fails the whole query
//! - nullable strings preserve null rather than casting it to `""`

use crate::entity::Entity;
use crate::schema::{Column, ColumnType, Schema};
use crate::value::{STORAGE_DATETIME_FORMAT, Value};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Value as RawValue;
use std::collections::HashMap;

/// One raw result row: column name to untyped store value
pub type RawRow = HashMap<String, RawValue>;

/// Hydrate one row into an entity.
///
/// Fails on the first non-nullable column with no corresponding value, and
/// on any value the coercion matrix rejects. On success the entity's
/// persistence state is `Loaded`.
pub fn hydrate(schema: &Schema, row: &RawRow) -> Result<Entity> {
    let mut entity = Entity::new();

    for column in schema.columns() {
        let raw = row
            .get(&column.name)
            .filter(|v| !matches!(v, RawValue::Null));

        let value = match raw {
            None => {
                if !column.nullable {
                    return Err(Error::hydration(&column.name, "column is not nullable"));
                }
                Value::Null
            }
            Some(raw) => coerce(column, raw)?,
        };

        entity.set(&column.name, value);
    }

    entity.mark_loaded();
    Ok(entity)
}

fn coerce(column: &Column, raw: &RawValue) -> Result<Value> {
    match column.column_type {
        ColumnType::String => coerce_string(column, raw),
        ColumnType::Integer => coerce_integer(column, raw),
        // Strict equality with integer 1; everything else is false
        ColumnType::Boolean => Ok(Value::Bool(matches!(raw, RawValue::Integer(1)))),
        ColumnType::DateTime => coerce_datetime(column, raw),
    }
}

fn coerce_string(column: &Column, raw: &RawValue) -> Result<Value> {
    match raw {
        RawValue::Text(s) => Ok(Value::Text(s.clone())),
        RawValue::Integer(i) => Ok(Value::Text(i.to_string())),
        RawValue::Real(f) => Ok(Value::Text(f.to_string())),
        other => Err(Error::hydration(
            &column.name,
            format!("cannot coerce {:?} to string", other),
        )),
    }
}

fn coerce_integer(column: &Column, raw: &RawValue) -> Result<Value> {
    match raw {
        RawValue::Integer(i) => Ok(Value::Int(*i)),
        RawValue::Real(f) => Ok(Value::Int(*f as i64)),
        RawValue::Text(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            Error::hydration(&column.name, format!("non-numeric value `{}`", s))
        }),
        other => Err(Error::hydration(
            &column.name,
            format!("cannot coerce {:?} to integer", other),
        )),
    }
}

fn coerce_datetime(column: &Column, raw: &RawValue) -> Result<Value> {
    let RawValue::Text(s) = raw else {
        return Err(Error::hydration(
            &column.name,
            format!("cannot coerce {:?} to datetime", raw),
        ));
    };
    parse_datetime(s)
        .map(Value::DateTime)
        .ok_or_else(|| Error::hydration(&column.name, format!("unparseable timestamp `{}`", s)))
}

/// Parse the storage format (`YYYY-MM-DD HH:MM:SS`, UTC assumed) or an
/// ISO-8601 timestamp with offset, normalized to UTC.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, STORAGE_DATETIME_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PersistenceState;
    use crate::schema::{EntityDeclaration, resolve};
    use chrono::TimeZone;

    fn user_schema() -> Schema {
        let decl = EntityDeclaration::legacy("users")
            .field("id", "string")
            .field("name", "string|null")
            .field("age", "int")
            .field("active", "bool")
            .field("createdAt", "DateTime|null");
        resolve(&decl).unwrap()
    }

    fn full_row() -> RawRow {
        RawRow::from([
            ("id".to_string(), RawValue::Text("a1".to_string())),
            ("name".to_string(), RawValue::Text("Ann".to_string())),
            ("age".to_string(), RawValue::Integer(30)),
            ("active".to_string(), RawValue::Integer(1)),
            (
                "createdAt".to_string(),
                RawValue::Text("2024-03-15 09:30:05".to_string()),
            ),
        ])
    }

    #[test]
    fn test_hydrates_full_row() {
        let entity = hydrate(&user_schema(), &full_row()).unwrap();
        assert_eq!(entity.state(), PersistenceState::Loaded);
        assert_eq!(entity.get("name"), &Value::Text("Ann".to_string()));
        assert_eq!(entity.get("age"), &Value::Int(30));
        assert_eq!(entity.get("active"), &Value::Bool(true));
        assert_eq!(
            entity.get("createdAt").as_datetime().unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 5).unwrap()
        );
    }

    #[test]
    fn test_missing_non_nullable_column_fails_with_name() {
        let mut row = full_row();
        row.remove("age");
        let err = hydrate(&user_schema(), &row).unwrap_err();
        match err {
            Error::Hydration { column, .. } => assert_eq!(column, "age"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sql_null_counts_as_absent() {
        let mut row = full_row();
        row.insert("age".to_string(), RawValue::Null);
        assert!(hydrate(&user_schema(), &row).is_err());
    }

    #[test]
    fn test_missing_nullable_column_hydrates_to_null() {
        let mut row = full_row();
        row.remove("name");
        row.remove("createdAt");
        let entity = hydrate(&user_schema(), &row).unwrap();
        assert!(entity.get("name").is_null());
        assert!(entity.get("createdAt").is_null());
    }

    #[test]
    fn test_boolean_coercion_is_asymmetric() {
        let schema = user_schema();
        for raw in [
            RawValue::Integer(0),
            RawValue::Integer(2),
            RawValue::Text("true".to_string()),
        ] {
            let mut row = full_row();
            row.insert("active".to_string(), raw);
            let entity = hydrate(&schema, &row).unwrap();
            assert_eq!(entity.get("active"), &Value::Bool(false));
        }

        let entity = hydrate(&schema, &full_row()).unwrap();
        assert_eq!(entity.get("active"), &Value::Bool(true));
    }

    #[test]
    fn test_nullable_boolean_null_stays_null() {
        let decl = EntityDeclaration::legacy("t")
            .field("id", "string")
            .field("flag", "bool|null");
        let schema = resolve(&decl).unwrap();

        let row = RawRow::from([
            ("id".to_string(), RawValue::Text("a1".to_string())),
            ("flag".to_string(), RawValue::Null),
        ]);
        let entity = hydrate(&schema, &row).unwrap();
        assert!(entity.get("flag").is_null());
    }

    #[test]
    fn test_integer_numeric_coercion() {
        let mut row = full_row();
        row.insert("age".to_string(), RawValue::Text(" 42 ".to_string()));
        let entity = hydrate(&user_schema(), &row).unwrap();
        assert_eq!(entity.get("age"), &Value::Int(42));
    }

    #[test]
    fn test_non_numeric_integer_rejected() {
        let mut row = full_row();
        row.insert("age".to_string(), RawValue::Text("thirty".to_string()));
        let err = hydrate(&user_schema(), &row).unwrap_err();
        assert!(matches!(err, Error::Hydration { .. }));
    }

    #[test]
    fn test_datetime_accepts_offset_and_normalizes_to_utc() {
        let mut row = full_row();
        row.insert(
            "createdAt".to_string(),
            RawValue::Text("2024-03-15T11:30:05+02:00".to_string()),
        );
        let entity = hydrate(&user_schema(), &row).unwrap();
        assert_eq!(
            entity.get("createdAt").as_datetime().unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 5).unwrap()
        );
    }

    #[test]
    fn test_unparseable_datetime_rejected() {
        let mut row = full_row();
        row.insert(
            "createdAt".to_string(),
            RawValue::Text("not a date".to_string()),
        );
        assert!(hydrate(&user_schema(), &row).is_err());
    }

    #[test]
    fn test_string_coerces_numbers_to_text() {
        let mut row = full_row();
        row.insert("name".to_string(), RawValue::Integer(7));
        let entity = hydrate(&user_schema(), &row).unwrap();
        assert_eq!(entity.get("name"), &Value::Text("7".to_string()));
    }
}
