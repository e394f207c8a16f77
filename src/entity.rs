//! In-memory entity records: a typed field bag plus persistence state.

use crate::schema::{ID_COLUMN, Schema};
use crate::value::Value;
use std::collections::HashMap;

/// Whether an entity originated from the store.
///
/// `New` on construction; flips to `Loaded` exactly once, after a successful
/// hydration or a successful INSERT, and never transitions back. This flag is
/// the sole signal selecting INSERT vs UPDATE on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceState {
    New,
    Loaded,
}

static NULL: Value = Value::Null;

/// An in-memory record bound to one entity type's schema.
#[derive(Debug, Clone)]
pub struct Entity {
    values: HashMap<String, Value>,
    state: PersistenceState,
}

impl Entity {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            state: PersistenceState::New,
        }
    }

    /// Construct with the identifier pre-populated (the mapping layer never
    /// generates identifiers itself)
    pub fn with_id(id: &str) -> Self {
        let mut entity = Self::new();
        entity.set(ID_COLUMN, id);
        entity
    }

    pub fn state(&self) -> PersistenceState {
        self.state
    }

    /// Mark the entity as originating from the store. One-way transition;
    /// only hydration and a successful INSERT may call this.
    pub(crate) fn mark_loaded(&mut self) {
        self.state = PersistenceState::Loaded;
    }

    /// Current value of a field; unset fields read as null
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&NULL)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn id(&self) -> &Value {
        self.get(ID_COLUMN)
    }

    /// Serialize through the schema to a JSON object, skipping the named
    /// fields. Datetimes render as ISO-8601 with offset.
    pub fn to_json(&self, schema: &Schema, skipped: &[&str]) -> serde_json::Value {
        let mut output = serde_json::Map::new();
        for column in schema.columns() {
            if skipped.contains(&column.name.as_str()) {
                continue;
            }
            output.insert(column.name.clone(), self.get(&column.name).to_json());
        }
        serde_json::Value::Object(output)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}
