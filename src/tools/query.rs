//! Query execution tool.
//!
//! This module implements the `query` MCP tool. Statements are checked by the
//! read-only guard before any connection is looked up.

use crate::db::{ConnectionRegistry, QueryExecutor};
use crate::error::ServerResult;
use crate::models::{ColumnMetadata, QueryParam, QueryRequest, QueryResult};
use crate::tools::sql_guard;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// Connection name from list_connections
    pub connection: String,
    /// SELECT, WITH or EXPLAIN statement. Write keywords anywhere in the text are rejected.
    pub sql: String,
    /// Positional parameters for $1, $2, ... placeholders
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// Maximum rows to return. Default: 100, max: 10000
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Output from the query tool.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// True if more rows were available than the limit
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self {
            row_count: result.row_count(),
            columns: result.columns,
            rows: result.rows,
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
        }
    }
}

/// Handler for query execution.
pub struct QueryToolHandler {
    registry: Arc<ConnectionRegistry>,
    executor: QueryExecutor,
}

impl QueryToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            executor: QueryExecutor::new(),
        }
    }

    pub async fn query(&self, input: QueryInput) -> ServerResult<QueryOutput> {
        sql_guard::validate_read_only(&input.sql)?;

        let pool = self.registry.get(&input.connection).await?;

        let mut request = QueryRequest::new(input.sql).with_params(input.params);
        if let Some(limit) = input.limit {
            request = request.with_limit(limit);
        }

        let result = self.executor.execute_query(&pool, &request).await?;

        info!(
            connection = %input.connection,
            row_count = result.row_count(),
            truncated = result.truncated,
            execution_time_ms = result.execution_time_ms,
            "Query executed"
        );

        Ok(result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;

    #[test]
    fn test_query_input_deserialization() {
        let json = r#"{
            "connection": "src",
            "sql": "SELECT * FROM users WHERE id = $1",
            "params": [42],
            "limit": 100
        }"#;

        let input: QueryInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.connection, "src");
        assert_eq!(input.params, vec![QueryParam::Int(42)]);
        assert_eq!(input.limit, Some(100));
    }

    #[test]
    fn test_query_output_shape() {
        let mut row = serde_json::Map::new();
        row.insert("id".to_string(), JsonValue::Number(1.into()));
        let result = QueryResult {
            columns: vec![ColumnMetadata::new("id", "INT4")],
            rows: vec![row],
            truncated: false,
            execution_time_ms: 3,
        };

        let json = serde_json::to_value(QueryOutput::from(result)).unwrap();
        assert_eq!(json["row_count"], 1);
        assert_eq!(json["truncated"], false);
        assert_eq!(json["columns"][0]["type_name"], "INT4");
        assert_eq!(json["rows"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_guard_runs_before_lookup() {
        let handler = QueryToolHandler::new(Arc::new(ConnectionRegistry::new()));
        let err = handler
            .query(QueryInput {
                connection: "missing".to_string(),
                sql: "DELETE FROM orders".to_string(),
                params: Vec::new(),
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotReadOnly { .. }));
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let handler = QueryToolHandler::new(Arc::new(ConnectionRegistry::new()));
        let err = handler
            .query(QueryInput {
                connection: "missing".to_string(),
                sql: "SELECT 1".to_string(),
                params: Vec::new(),
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::ConnectionNotFound { .. }));
    }
}
