//! # Rowmap - Minimal Entity-Relational Mapping Layer
//!
//! Rowmap bridges in-memory entities and rows in a SQLite store.
//!
//! Rowmap provides:
//! - Schema descriptors resolved from entity declarations (two metadata formats)
//! - Row hydration with a strict type-coercion matrix and nullability checks
//! - Dynamic INSERT/UPDATE assembly from entity state
//! - A persistence engine owning one connection with explicit transactions
//!
//! Table and column identifiers are interpolated into SQL unquoted; they are
//! trusted input and must never come from the request boundary.

pub mod config;
pub mod engine;
pub mod entity;
pub mod hydrate;
pub mod registry;
pub mod schema;
pub mod sql;
pub mod value;

// Re-exports for convenient access
pub use config::EngineConfig;
pub use engine::Engine;
pub use entity::{Entity, PersistenceState};
pub use registry::{EntityDef, schema_for};
pub use schema::{Column, ColumnType, EntityDeclaration, Schema, SchemaFormat};
pub use sql::{SortDirection, Statement};
pub use value::Value;

/// Result type alias for rowmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for rowmap operations.
///
/// All three persistence-layer failure kinds propagate uncaught past this
/// crate's boundary; nothing here is logged-and-swallowed or retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unrecognized schema format version or a malformed table/column marker
    #[error("Schema resolution failed: {0}")]
    SchemaResolution(String),

    /// Required column missing from a row, or a value failed type coercion
    #[error("Hydration failed for column `{column}`: {reason}")]
    Hydration { column: String, reason: String },

    /// Underlying statement-execution failure (connectivity, constraint, syntax)
    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Transaction misuse: nested begin, or commit/rollback with none open
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl Error {
    pub(crate) fn hydration(column: &str, reason: impl Into<String>) -> Self {
        Error::Hydration {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}
