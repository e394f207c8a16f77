//! Process-wide schema cache keyed by entity type identity.
//!
//! Resolution is deterministic (see [`crate::schema::resolve`]), so one
//! resolved [`Schema`] per type is shared for the life of the process.

use crate::schema::{self, EntityDeclaration, Schema};
use crate::Result;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

/// Collaborator interface for mapped entity types.
///
/// Implementors describe their table and fields once; the resolved schema is
/// cached under the implementing type's identity.
pub trait EntityDef: 'static {
    fn declaration() -> EntityDeclaration;
}

static SCHEMAS: LazyLock<RwLock<HashMap<TypeId, Arc<Schema>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Resolve the schema for `T`, computing it at most once per process.
pub fn schema_for<T: EntityDef>() -> Result<Arc<Schema>> {
    let key = TypeId::of::<T>();

    if let Some(schema) = SCHEMAS
        .read()
        .expect("schema cache lock poisoned")
        .get(&key)
    {
        return Ok(Arc::clone(schema));
    }

    let schema = Arc::new(schema::resolve(&T::declaration())?);
    SCHEMAS
        .write()
        .expect("schema cache lock poisoned")
        .entry(key)
        .or_insert_with(|| Arc::clone(&schema));
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    struct Account;

    impl EntityDef for Account {
        fn declaration() -> EntityDeclaration {
            EntityDeclaration::declarative("accounts", "v1")
                .nullable_column("owner", ColumnType::String)
                .column("active", ColumnType::Boolean)
        }
    }

    #[test]
    fn test_schema_is_cached_per_type() {
        let first = schema_for::<Account>().unwrap();
        let second = schema_for::<Account>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.table(), "accounts");
        assert_eq!(first.columns()[0].name, "id");
    }
}
