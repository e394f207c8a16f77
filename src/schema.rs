//! Schema descriptors and the resolver for the two metadata formats.
//!
//! An entity type describes its mapped columns in one of two coexisting
//! formats:
//! - `Legacy`: every declared field is a column; type and nullability are
//!   parsed out of an inline annotation string (`"string"`, `"int"`,
//!   `"DateTime|null"` ...). Absence of a table marker implies legacy.
//! - `Declarative` (v1/v2): a type-level table marker records the table name
//!   and format version; per-field column markers carry type and nullability
//!   explicitly. The `id` column is always synthesized first.
//!
//! Resolution is a pure function of the declaration: deterministic and
//! idempotent, which makes the resolved [`Schema`] safe to cache
//! process-wide (see [`crate::registry`]).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the identifier column every schema carries
pub const ID_COLUMN: &str = "id";

/// Marker suffix that flags a legacy annotation as nullable
const NULLABLE_MARKER: &str = "|null";

/// Semantic column types - every mapped field is one of these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Boolean,
    DateTime,
}

impl ColumnType {
    /// Get the string representation of the column type
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
        }
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "string" | "str" | "text" => Ok(ColumnType::String),
            "int" | "integer" => Ok(ColumnType::Integer),
            "bool" | "boolean" => Ok(ColumnType::Boolean),
            "datetime" => Ok(ColumnType::DateTime),
            _ => Err(Error::SchemaResolution(format!(
                "unknown column type `{}`",
                s
            ))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptor for one mapped field. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: &str, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable,
        }
    }
}

/// Which resolution strategy governs an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Legacy,
    DeclarativeV1,
    DeclarativeV2,
}

/// Field metadata as declared on an entity type
#[derive(Debug, Clone)]
pub enum FieldDecl {
    /// Legacy inline type annotation, e.g. `"DateTime|null"`
    Annotated { name: String, annotation: String },
    /// Declarative column marker with explicit type and nullability
    Column {
        name: String,
        column_type: ColumnType,
        nullable: bool,
    },
    /// Declared on the type but carrying no column marker
    Unmapped { name: String },
}

/// Static description of an entity type: table, format marker, fields.
///
/// Built once per type at registration (usually inside
/// [`crate::EntityDef::declaration`]) and handed to [`resolve`].
#[derive(Debug, Clone)]
pub struct EntityDeclaration {
    table: String,
    /// Declared format version from the table marker; `None` means legacy
    format_version: Option<String>,
    fields: Vec<FieldDecl>,
}

impl EntityDeclaration {
    /// A legacy entity: no table marker, inline annotations on every field
    pub fn legacy(table: &str) -> Self {
        Self {
            table: table.to_string(),
            format_version: None,
            fields: Vec::new(),
        }
    }

    /// A declarative entity: table marker with an explicit format version
    pub fn declarative(table: &str, version: &str) -> Self {
        Self {
            table: table.to_string(),
            format_version: Some(version.to_string()),
            fields: Vec::new(),
        }
    }

    /// Declare a legacy field with an inline type annotation
    pub fn field(mut self, name: &str, annotation: &str) -> Self {
        self.fields.push(FieldDecl::Annotated {
            name: name.to_string(),
            annotation: annotation.to_string(),
        });
        self
    }

    /// Declare a declaratively-marked column. Nullability defaults to false;
    /// use [`Self::nullable_column`] for the opt-in.
    pub fn column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.fields.push(FieldDecl::Column {
            name: name.to_string(),
            column_type,
            nullable: false,
        });
        self
    }

    pub fn nullable_column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.fields.push(FieldDecl::Column {
            name: name.to_string(),
            column_type,
            nullable: true,
        });
        self
    }

    /// Declare a field with no column marker (excluded from the schema)
    pub fn unmapped(mut self, name: &str) -> Self {
        self.fields.push(FieldDecl::Unmapped {
            name: name.to_string(),
        });
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Decide the governing format from the type-level marker.
    ///
    /// Only two declarative versions are recognized; anything else is a
    /// resolver error rather than the silently-empty schema it used to
    /// produce upstream.
    fn format(&self) -> Result<SchemaFormat> {
        match self.format_version.as_deref() {
            None => Ok(SchemaFormat::Legacy),
            Some("v1") => Ok(SchemaFormat::DeclarativeV1),
            Some("v2") => Ok(SchemaFormat::DeclarativeV2),
            Some(other) => Err(Error::SchemaResolution(format!(
                "unsupported schema format `{}` on table `{}`",
                other, self.table
            ))),
        }
    }
}

/// Ordered sequence of column descriptors for one entity type.
///
/// Always contains exactly one `id` column, never nullable. Order matters:
/// it fixes the column order of generated INSERT statements and the lookup
/// order during hydration.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    table: String,
    format: SchemaFormat,
    columns: Vec<Column>,
}

impl Schema {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn format(&self) -> SchemaFormat {
        self.format
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Resolve an entity declaration into its ordered schema.
///
/// Pure function of the declaration: calling it twice yields
/// descriptor-for-descriptor identical results.
pub fn resolve(decl: &EntityDeclaration) -> Result<Schema> {
    let format = decl.format()?;
    let columns = match format {
        SchemaFormat::Legacy => resolve_legacy(decl)?,
        SchemaFormat::DeclarativeV1 | SchemaFormat::DeclarativeV2 => resolve_declarative(decl)?,
    };

    validate(decl.table(), &columns)?;

    Ok(Schema {
        table: decl.table.clone(),
        format,
        columns,
    })
}

/// Legacy path: every declared field is a column, type and nullability
/// parsed from its inline annotation, in declaration order.
fn resolve_legacy(decl: &EntityDeclaration) -> Result<Vec<Column>> {
    let mut columns = Vec::with_capacity(decl.fields.len());
    for field in &decl.fields {
        match field {
            FieldDecl::Annotated { name, annotation } => {
                columns.push(parse_annotation(name, annotation)?);
            }
            FieldDecl::Column { name, .. } | FieldDecl::Unmapped { name } => {
                return Err(Error::SchemaResolution(format!(
                    "legacy schema for table `{}` expects an inline annotation on field `{}`",
                    decl.table, name
                )));
            }
        }
    }
    Ok(columns)
}

/// Declarative path: synthesize `id` first, then map marked fields in
/// declaration order. Unmarked fields and a redeclared `id` are silently
/// excluded.
fn resolve_declarative(decl: &EntityDeclaration) -> Result<Vec<Column>> {
    let mut columns = vec![Column::new(ID_COLUMN, ColumnType::String, false)];
    for field in &decl.fields {
        if let FieldDecl::Column {
            name,
            column_type,
            nullable,
        } = field
        {
            if name == ID_COLUMN {
                continue;
            }
            columns.push(Column::new(name, *column_type, *nullable));
        }
    }
    Ok(columns)
}

/// Parse a legacy inline annotation like `"DateTime|null"` into a descriptor
fn parse_annotation(name: &str, annotation: &str) -> Result<Column> {
    let mut annotation = annotation.replace(' ', "");
    let mut nullable = false;

    if annotation.contains(NULLABLE_MARKER) {
        annotation = annotation.replace(NULLABLE_MARKER, "");
        nullable = true;
    }

    let column_type = annotation.parse::<ColumnType>().map_err(|_| {
        Error::SchemaResolution(format!(
            "malformed annotation `{}` on field `{}`",
            annotation, name
        ))
    })?;

    Ok(Column::new(name, column_type, nullable))
}

/// Enforce the schema invariants: one non-nullable `id`, unique names.
fn validate(table: &str, columns: &[Column]) -> Result<()> {
    let ids: Vec<&Column> = columns.iter().filter(|c| c.name == ID_COLUMN).collect();
    match ids.as_slice() {
        [] => {
            return Err(Error::SchemaResolution(format!(
                "schema for table `{}` has no `{}` column",
                table, ID_COLUMN
            )));
        }
        [id] => {
            if id.nullable {
                return Err(Error::SchemaResolution(format!(
                    "identifier column of table `{}` cannot be nullable",
                    table
                )));
            }
        }
        _ => {
            return Err(Error::SchemaResolution(format!(
                "schema for table `{}` declares `{}` more than once",
                table, ID_COLUMN
            )));
        }
    }

    for (i, column) in columns.iter().enumerate() {
        if columns[..i].iter().any(|c| c.name == column.name) {
            return Err(Error::SchemaResolution(format!(
                "duplicate column `{}` in schema for table `{}`",
                column.name, table
            )));
        }
    }

    Ok(())
}
