//! Dynamic SQL assembly: INSERT/UPDATE statements from entity state.
//!
//! Text shape is part of the contract: columns joined with bare commas in
//! schema order, positional `?` placeholders, and a literal `null` in place
//! of a placeholder whenever the field is unset or null. Identifiers are
//! interpolated unquoted (trusted caller).

use crate::entity::Entity;
use crate::schema::{ID_COLUMN, Schema};
use crate::value::Value;

/// A generated statement: SQL text plus its bound parameters in
/// placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Sort direction for [`order_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Build an INSERT covering every column in schema order.
///
/// The identifier is included; the caller is responsible for pre-populating
/// it. Unset/null fields become a literal `null` in the VALUES list rather
/// than a bound parameter.
pub fn insert(schema: &Schema, entity: &Entity) -> Statement {
    let mut fields = Vec::with_capacity(schema.columns().len());
    let mut placeholders = Vec::with_capacity(schema.columns().len());
    let mut params = Vec::new();

    for column in schema.columns() {
        fields.push(column.name.as_str());

        let value = entity.get(&column.name);
        if value.is_null() {
            placeholders.push("null");
            continue;
        }
        placeholders.push("?");
        params.push(bind_value(value));
    }

    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES({})",
            schema.table(),
            fields.join(","),
            placeholders.join(",")
        ),
        params,
    }
}

/// Build an UPDATE over every column except the identifier, binding the
/// identifier last in the WHERE clause.
pub fn update(schema: &Schema, entity: &Entity) -> Statement {
    let mut assignments = Vec::with_capacity(schema.columns().len());
    let mut params = Vec::new();

    for column in schema.columns() {
        if column.name == ID_COLUMN {
            continue;
        }

        let value = entity.get(&column.name);
        if value.is_null() {
            assignments.push(format!("{} = null", column.name));
            continue;
        }
        assignments.push(format!("{} = ?", column.name));
        params.push(bind_value(value));
    }

    params.push(bind_value(entity.id()));

    Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?",
            schema.table(),
            assignments.join(","),
            ID_COLUMN
        ),
        params,
    }
}

/// Append-ready ORDER BY clause, empty when the column is not allow-listed.
/// The allow-list is what keeps caller-supplied sort columns out of raw SQL.
pub fn order_by(column: &str, direction: SortDirection, allowed: &[&str]) -> String {
    if !allowed.contains(&column) {
        return String::new();
    }
    format!(" ORDER BY {} {}", column, direction.as_str())
}

/// Coerce a field value into its bound-parameter representation:
/// datetimes to storage text, booleans to 1/0, the rest pass through.
fn bind_value(value: &Value) -> Value {
    match value {
        Value::DateTime(dt) => Value::Text(Value::storage_datetime(dt)),
        Value::Bool(b) => Value::Int(i64::from(*b)),
        other => other.clone(),
    }
}
