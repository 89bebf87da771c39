//! PostgreSQL MCP service.
//!
//! `PgService` exposes connection management, read-only queries and schema
//! inspection over MCP. Every tool resolves its connection by name through the
//! shared [`ConnectionRegistry`].

use crate::db::ConnectionRegistry;
use crate::error::ServerResult;
use crate::mcp::response::{into_call_result, validate_connection_name};
use crate::tools::compare::{CompareRowCountsInput, CompareSchemasInput, CompareToolHandler};
use crate::tools::connection::{AddConnectionInput, ConnectionToolHandler, RemoveConnectionInput};
use crate::tools::query::{QueryInput, QueryToolHandler};
use crate::tools::schema::{
    ConnectionInput, ListTablesInput, SampleRowsInput, SchemaToolHandler, TableInput,
};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct PgService {
    /// Named connections shared by every tool call
    registry: Arc<ConnectionRegistry>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl PgService {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            tool_router: Self::tool_router(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    fn schema_handler(&self) -> SchemaToolHandler {
        SchemaToolHandler::new(self.registry.clone())
    }
}

#[tool_router]
impl PgService {
    #[tool(
        description = "Register a PostgreSQL connection under a name.\nThe connection is verified with SELECT 1 before it is registered.\nThe password is used to connect and is never stored or returned."
    )]
    async fn add_connection(
        &self,
        Parameters(input): Parameters<AddConnectionInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.name = validate_connection_name(&input.name)?;
            ConnectionToolHandler::new(self.registry.clone())
                .add_connection(input)
                .await
        }
        .await;
        into_call_result("add_connection", result)
    }

    #[tool(
        description = "Remove a registered connection and close its pool.\nQueries still running on it may fail."
    )]
    async fn remove_connection(
        &self,
        Parameters(input): Parameters<RemoveConnectionInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.name = validate_connection_name(&input.name)?;
            ConnectionToolHandler::new(self.registry.clone())
                .remove_connection(input)
                .await
        }
        .await;
        into_call_result("remove_connection", result)
    }

    #[tool(
        description = "List registered connections.\nReturns name, host, port, database and user for each. Passwords are never shown."
    )]
    async fn list_connections(&self) -> Result<CallToolResult, McpError> {
        let output = ConnectionToolHandler::new(self.registry.clone())
            .list_connections()
            .await;
        into_call_result("list_connections", Ok(output))
    }

    #[tool(
        description = "Run a read-only SQL statement and return rows as JSON.\nOnly SELECT, WITH and EXPLAIN are accepted; statements containing write keywords are rejected.\nUse $1, $2, ... placeholders with params. Default limit: 100 rows, max: 10000."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.connection = validate_connection_name(&input.connection)?;
            QueryToolHandler::new(self.registry.clone())
                .query(input)
                .await
        }
        .await;
        into_call_result("query", result)
    }

    #[tool(description = "List user schemas.\nSystem schemas (pg_catalog, information_schema, pg_toast) are omitted.")]
    async fn list_schemas(
        &self,
        Parameters(input): Parameters<ConnectionInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.connection = validate_connection_name(&input.connection)?;
            self.schema_handler().list_schemas(input).await
        }
        .await;
        into_call_result("list_schemas", result)
    }

    #[tool(
        description = "List tables in a schema with size, estimated row count and comment.\nIncludes views unless include_views is false. Default schema: public."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.connection = validate_connection_name(&input.connection)?;
            self.schema_handler().list_tables(input).await
        }
        .await;
        into_call_result("list_tables", result)
    }

    #[tool(
        description = "Describe a table's columns.\nReturns type, nullability, default, comment, primary key and foreign key references."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.connection = validate_connection_name(&input.connection)?;
            self.schema_handler().describe_table(input).await
        }
        .await;
        into_call_result("describe_table", result)
    }

    #[tool(description = "List indexes on a table with their columns, uniqueness and definition.")]
    async fn list_indexes(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.connection = validate_connection_name(&input.connection)?;
            self.schema_handler().list_indexes(input).await
        }
        .await;
        into_call_result("list_indexes", result)
    }

    #[tool(description = "List foreign keys declared on a table and the columns they reference.")]
    async fn list_foreign_keys(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.connection = validate_connection_name(&input.connection)?;
            self.schema_handler().list_foreign_keys(input).await
        }
        .await;
        into_call_result("list_foreign_keys", result)
    }

    #[tool(description = "Return the first rows of a table.\nDefault limit: 10, max: 1000.")]
    async fn sample_rows(
        &self,
        Parameters(input): Parameters<SampleRowsInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.connection = validate_connection_name(&input.connection)?;
            self.schema_handler().sample_rows(input).await
        }
        .await;
        into_call_result("sample_rows", result)
    }

    #[tool(description = "Count the rows in a table exactly with COUNT(*).")]
    async fn row_count(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut input = input;
        let result: ServerResult<_> = async {
            input.connection = validate_connection_name(&input.connection)?;
            self.schema_handler().row_count(input).await
        }
        .await;
        into_call_result("row_count", result)
    }

    #[tool(
        description = "Compare the tables of one schema across several connections.\nReturns each connection's tables (or its error), the tables common to all, and the tables unique to each."
    )]
    async fn compare_schemas(
        &self,
        Parameters(input): Parameters<CompareSchemasInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = CompareToolHandler::new(self.registry.clone())
            .compare_schemas(input)
            .await;
        into_call_result("compare_schemas", result)
    }

    #[tool(
        description = "Count a table's rows on several connections.\nEach connection reports its count or its error; one failure does not stop the others."
    )]
    async fn compare_row_counts(
        &self,
        Parameters(input): Parameters<CompareRowCountsInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = CompareToolHandler::new(self.registry.clone())
            .compare_row_counts(input)
            .await;
        into_call_result("compare_row_counts", result)
    }
}

#[tool_handler]
impl ServerHandler for PgService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pg-mcp-server".to_owned(),
                title: Some("PostgreSQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only PostgreSQL tools over named connections.\n\
                \n\
                ## Workflow\n\
                1. Call `list_connections` to see registered names, or `add_connection` to register one\n\
                2. Pass the name as `connection` to every other tool\n\
                3. Explore with `list_schemas`, `list_tables`, `describe_table` before writing queries\n\
                \n\
                ## Queries\n\
                - `query` accepts SELECT, WITH and EXPLAIN only\n\
                - Any write keyword (INSERT, UPDATE, DELETE, DROP, ...) anywhere in the text is rejected, \
                  even inside string literals\n\
                - Results are capped (default 100 rows); `truncated: true` means more rows exist\n\
                \n\
                ## Comparing environments\n\
                - `compare_schemas` and `compare_row_counts` take a list of connection names\n\
                - Each connection reports its own result or error"
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> PgService {
        PgService::new(Arc::new(ConnectionRegistry::new()))
    }

    #[test]
    fn test_server_info() {
        let info = create_test_service().get_info();
        assert_eq!(info.server_info.name, "pg-mcp-server");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("list_connections"));
    }

    #[test]
    fn test_all_tools_registered() {
        let service = create_test_service();
        let mut names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "add_connection",
                "compare_row_counts",
                "compare_schemas",
                "describe_table",
                "list_connections",
                "list_foreign_keys",
                "list_indexes",
                "list_schemas",
                "list_tables",
                "query",
                "remove_connection",
                "row_count",
                "sample_rows",
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_connection_is_tool_error() {
        let service = create_test_service();
        let result = service
            .row_count(Parameters(TableInput {
                connection: "  ".to_string(),
                table: "orders".to_string(),
                schema: "public".to_string(),
            }))
            .await
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], serde_json::json!(true));
        assert!(
            json["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("connection is required")
        );
    }

    #[tokio::test]
    async fn test_padded_connection_name_is_rejected() {
        let result = create_test_service()
            .remove_connection(Parameters(RemoveConnectionInput {
                name: " src".to_string(),
            }))
            .await
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], serde_json::json!(true));
        assert!(
            json["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("leading or trailing whitespace")
        );
    }

    #[tokio::test]
    async fn test_list_connections_empty() {
        let result = create_test_service().list_connections().await.unwrap();
        let json = serde_json::to_value(&result).unwrap();
        let text = json["content"][0]["text"].as_str().unwrap();
        let payload: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["count"], 0);
    }
}
