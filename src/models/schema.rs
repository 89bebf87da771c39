//! Schema-related data models.
//!
//! This module defines types for PostgreSQL schema introspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    pub table_type: TableType,
    /// Bytes (data + indexes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    /// Planner estimate from pg_stat_user_tables, not an exact count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Last vacuum or analyze
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, schema: impl Into<String>, table_type: TableType) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            table_type,
            total_size: None,
            estimated_rows: None,
            comment: None,
            updated_at: None,
        }
    }

    pub fn with_total_size(mut self, total_size: u64) -> Self {
        self.total_size = Some(total_size);
        self
    }

    pub fn with_estimated_rows(mut self, rows: u64) -> Self {
        self.estimated_rows = Some(rows);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}

/// Type of table-like object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    Table,
    View,
    MaterializedView,
    ForeignTable,
}

impl TableType {
    /// Parse from an `information_schema.tables.table_type` value.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "view" => Self::View,
            "materialized view" | "matview" => Self::MaterializedView,
            "foreign" | "foreign table" => Self::ForeignTable,
            _ => Self::Table,
        }
    }
}

impl std::fmt::Display for TableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::View => write!(f, "view"),
            Self::MaterializedView => write!(f, "materialized_view"),
            Self::ForeignTable => write!(f, "foreign_table"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub schema_name: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexInfo>,
}

impl TableSchema {
    /// Get the schema-qualified table name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Full type as rendered by format_type (e.g., `character varying(30)`)
    pub data_type: String,
    pub nullable: bool,
    /// Default value with appropriate JSON type based on column data type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
            is_primary_key: false,
            comment: None,
        }
    }

    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }

    /// Set the default value from its catalog text, converting to a JSON type
    /// based on the column's data_type.
    pub fn with_default_str(mut self, default_str: &str) -> Self {
        self.default_value = Some(parse_default_value(default_str, &self.data_type));
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub column: String,
    pub references_schema: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Parse from an `information_schema.referential_constraints` rule.
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "SET DEFAULT" => Self::SetDefault,
            "RESTRICT" => Self::Restrict,
            _ => Self::NoAction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
    /// btree, hash, gin, gist, brin, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Full CREATE INDEX statement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl IndexInfo {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            is_unique: false,
            is_primary: false,
            method: None,
            definition: None,
        }
    }

    pub fn with_unique(mut self, is_unique: bool) -> Self {
        self.is_unique = is_unique;
        self
    }

    /// Primary key indexes are always unique.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        if is_primary {
            self.is_unique = true;
        }
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }
}

/// Parse a PostgreSQL column default into the appropriate JSON type.
///
/// Literal defaults come back from the catalog with a cast, e.g.
/// `'active'::character varying` or `'{}'::jsonb`; the cast is stripped and the
/// literal unquoted. Expressions such as `now()` or
/// `nextval('users_id_seq'::regclass)` stay as strings.
pub fn parse_default_value(default_str: &str, data_type: &str) -> serde_json::Value {
    let dt_lower = data_type.to_lowercase();
    let literal = strip_literal_cast(default_str);

    if dt_lower.contains("int") || dt_lower.contains("serial") {
        if let Ok(n) = literal.parse::<i64>() {
            return serde_json::Value::Number(n.into());
        }
    }

    if dt_lower.contains("double") || dt_lower == "real" {
        if let Some(num) = literal
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return serde_json::Value::Number(num);
        }
    }

    if dt_lower == "boolean" {
        match literal.to_lowercase().as_str() {
            "true" => return serde_json::Value::Bool(true),
            "false" => return serde_json::Value::Bool(false),
            _ => {}
        }
    }

    if dt_lower == "json" || dt_lower == "jsonb" {
        if let Ok(parsed) = serde_json::from_str(&literal) {
            return parsed;
        }
    }

    // numeric keeps its exact text; everything else is a string
    serde_json::Value::String(literal)
}

/// `'abc'::text` -> `abc`, `'it''s'::text` -> `it's`, `(-1)` -> `-1`.
/// Anything that is not a quoted literal with a trailing cast is returned as-is.
fn strip_literal_cast(default_str: &str) -> String {
    let trimmed = default_str.trim();

    if let Some(rest) = trimmed.strip_prefix('\'') {
        if let Some(end) = rest.rfind("'::") {
            let cast = &rest[end + 3..];
            if !cast.contains('(') || cast.ends_with(')') && !cast.contains('\'') {
                return rest[..end].replace("''", "'");
            }
        }
    }

    if let Some(inner) = trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        if inner.parse::<f64>().is_ok() {
            return inner.to_string();
        }
    }

    trimmed.to_string()
}
