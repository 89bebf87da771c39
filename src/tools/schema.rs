//! Schema introspection tools.
//!
//! This module implements `list_schemas`, `list_tables`, `describe_table`,
//! `list_indexes`, `list_foreign_keys`, `sample_rows` and `row_count`.

use crate::db::{ConnectionRegistry, SchemaInspector};
use crate::error::ServerResult;
use crate::models::{
    ColumnDefinition, DEFAULT_SAMPLE_LIMIT, ForeignKey, IndexInfo, MAX_SAMPLE_LIMIT, TableInfo,
    TableSchema,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_SCHEMA: &str = "public";

pub(crate) fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_true() -> bool {
    true
}

/// Format bytes as human-readable size string.
///
/// Uses binary units (1 kB = 1024 bytes) consistent with database tools.
///
/// # Examples
///
/// ```
/// use pg_sheet_mcp::tools::schema::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1024), "1 kB");
/// assert_eq!(format_size(1048576), "1 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::WINDOWS)
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ConnectionInput {
    /// Connection name from list_connections
    pub connection: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Connection name from list_connections
    pub connection: String,
    /// Schema to list. Default: public
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Include views in the result. Default: true
    #[serde(default = "default_true")]
    pub include_views: bool,
}

/// Input shared by the single-table tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableInput {
    /// Connection name from list_connections
    pub connection: String,
    /// Table name (case-sensitive, unquoted)
    pub table: String,
    /// Schema containing the table. Default: public
    #[serde(default = "default_schema")]
    pub schema: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SampleRowsInput {
    /// Connection name from list_connections
    pub connection: String,
    /// Table name (case-sensitive, unquoted)
    pub table: String,
    /// Schema containing the table. Default: public
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Number of rows. Default: 10, max: 1000
    #[serde(default)]
    pub limit: Option<u32>,
}

impl SampleRowsInput {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .map(|l| l.clamp(1, MAX_SAMPLE_LIMIT))
            .unwrap_or(DEFAULT_SAMPLE_LIMIT)
    }
}

// =============================================================================
// Outputs
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ListSchemasOutput {
    pub schemas: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListTablesOutput {
    pub schema: String,
    pub tables: Vec<TableInfoOutput>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableInfoOutput {
    pub name: String,
    /// "table" or "view"
    #[serde(rename = "type")]
    pub table_type: String,
    /// Bytes (data + indexes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size_formatted: Option<String>,
    /// Planner estimate; use row_count for an exact figure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<TableInfo> for TableInfoOutput {
    fn from(info: TableInfo) -> Self {
        Self {
            name: info.name,
            table_type: info.table_type.to_string(),
            total_size: info.total_size,
            total_size_formatted: info.total_size.map(format_size),
            estimated_rows: info.estimated_rows,
            comment: info.comment,
            updated_at: info.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyRef {
    pub schema: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnOutput {
    #[serde(flatten)]
    pub definition: ColumnDefinition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribeTableOutput {
    pub table: String,
    pub schema: String,
    pub columns: Vec<ColumnOutput>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexInfo>,
}

impl From<TableSchema> for DescribeTableOutput {
    fn from(schema: TableSchema) -> Self {
        let fk_map: HashMap<&str, ForeignKeyRef> = schema
            .foreign_keys
            .iter()
            .map(|fk| {
                (
                    fk.column.as_str(),
                    ForeignKeyRef {
                        schema: fk.references_schema.clone(),
                        table: fk.references_table.clone(),
                        column: fk.references_column.clone(),
                    },
                )
            })
            .collect();

        let columns = schema
            .columns
            .into_iter()
            .map(|definition| {
                let foreign_key = fk_map.get(definition.name.as_str()).cloned();
                ColumnOutput {
                    definition,
                    foreign_key,
                }
            })
            .collect();

        Self {
            table: schema.table_name,
            schema: schema.schema_name,
            columns,
            primary_key: schema.primary_key,
            foreign_keys: schema.foreign_keys,
            indexes: schema.indexes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListIndexesOutput {
    pub table: String,
    pub schema: String,
    pub indexes: Vec<IndexInfo>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListForeignKeysOutput {
    pub table: String,
    pub schema: String,
    pub foreign_keys: Vec<ForeignKey>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleRowsOutput {
    pub table: String,
    pub schema: String,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowCountOutput {
    pub table: String,
    pub schema: String,
    pub count: i64,
}

// =============================================================================
// Handler
// =============================================================================

pub struct SchemaToolHandler {
    registry: Arc<ConnectionRegistry>,
}

impl SchemaToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list_schemas(&self, input: ConnectionInput) -> ServerResult<ListSchemasOutput> {
        let pool = self.registry.get(&input.connection).await?;
        let schemas = SchemaInspector::list_schemas(&pool).await?;
        let count = schemas.len();

        info!(connection = %input.connection, count, "Listed schemas");
        Ok(ListSchemasOutput { schemas, count })
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> ServerResult<ListTablesOutput> {
        let pool = self.registry.get(&input.connection).await?;
        let tables =
            SchemaInspector::list_tables(&pool, &input.schema, input.include_views).await?;
        let count = tables.len();

        info!(
            connection = %input.connection,
            schema = %input.schema,
            count,
            "Listed tables"
        );

        Ok(ListTablesOutput {
            schema: input.schema,
            tables: tables.into_iter().map(Into::into).collect(),
            count,
        })
    }

    pub async fn describe_table(&self, input: TableInput) -> ServerResult<DescribeTableOutput> {
        let pool = self.registry.get(&input.connection).await?;
        let schema = SchemaInspector::describe_table(&pool, &input.table, &input.schema).await?;

        info!(
            connection = %input.connection,
            table = %input.table,
            columns = schema.columns.len(),
            "Described table"
        );

        Ok(schema.into())
    }

    pub async fn list_indexes(&self, input: TableInput) -> ServerResult<ListIndexesOutput> {
        let pool = self.registry.get(&input.connection).await?;
        let indexes = SchemaInspector::list_indexes(&pool, &input.table, &input.schema).await?;
        let count = indexes.len();

        info!(connection = %input.connection, table = %input.table, count, "Listed indexes");
        Ok(ListIndexesOutput {
            table: input.table,
            schema: input.schema,
            indexes,
            count,
        })
    }

    pub async fn list_foreign_keys(
        &self,
        input: TableInput,
    ) -> ServerResult<ListForeignKeysOutput> {
        let pool = self.registry.get(&input.connection).await?;
        let foreign_keys =
            SchemaInspector::list_foreign_keys(&pool, &input.table, &input.schema).await?;
        let count = foreign_keys.len();

        info!(
            connection = %input.connection,
            table = %input.table,
            count,
            "Listed foreign keys"
        );
        Ok(ListForeignKeysOutput {
            table: input.table,
            schema: input.schema,
            foreign_keys,
            count,
        })
    }

    pub async fn sample_rows(&self, input: SampleRowsInput) -> ServerResult<SampleRowsOutput> {
        let limit = input.effective_limit();
        let pool = self.registry.get(&input.connection).await?;
        let rows = SchemaInspector::sample_rows(&pool, &input.table, &input.schema, limit).await?;
        let row_count = rows.len();

        info!(
            connection = %input.connection,
            table = %input.table,
            row_count,
            "Sampled rows"
        );
        Ok(SampleRowsOutput {
            table: input.table,
            schema: input.schema,
            rows,
            row_count,
        })
    }

    pub async fn row_count(&self, input: TableInput) -> ServerResult<RowCountOutput> {
        let pool = self.registry.get(&input.connection).await?;
        let count = SchemaInspector::row_count(&pool, &input.table, &input.schema).await?;

        info!(connection = %input.connection, table = %input.table, count, "Counted rows");
        Ok(RowCountOutput {
            table: input.table,
            schema: input.schema,
            count,
        })
    }
}
