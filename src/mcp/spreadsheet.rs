//! Spreadsheet MCP service.

use crate::mcp::response::into_call_result;
use crate::tools::spreadsheet::{
    ListSheetsInput, MAX_CELLS, ReadSpreadsheetInput, SpreadsheetToolHandler,
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
pub struct SheetService {
    handler: Arc<SpreadsheetToolHandler>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl SheetService {
    /// `max_rows` caps the rows any single `read_spreadsheet` call returns.
    pub fn new(max_rows: usize) -> Self {
        Self {
            handler: Arc::new(SpreadsheetToolHandler::new(max_rows)),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl SheetService {
    #[tool(
        description = "List the sheets in a workbook with the size of each sheet's used area.\nSupports .xlsx, .xls, .ods and .csv. A CSV file has one sheet named after the file."
    )]
    async fn list_sheets(
        &self,
        Parameters(input): Parameters<ListSheetsInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.handler.list_sheets(input).await;
        into_call_result("list_sheets", result)
    }

    #[tool(
        description = "Read cells from a sheet.\nDefaults to the first sheet and its used area; range takes A1 notation such as B2:D10 or C3.\nWith has_header (default true) the first row names the columns and rows come back as objects; otherwise rows are arrays.\nEmpty cells are null. CSV files must be UTF-8."
    )]
    async fn read_spreadsheet(
        &self,
        Parameters(input): Parameters<ReadSpreadsheetInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.handler.read_spreadsheet(input).await;
        into_call_result("read_spreadsheet", result)
    }
}

#[tool_handler]
impl ServerHandler for SheetService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sheet-mcp-server".to_owned(),
                title: Some("Spreadsheet MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Spreadsheet reading tools for .xlsx, .xls, .ods and .csv files.\n\
                \n\
                ## Workflow\n\
                1. Call `list_sheets` with the file path to see sheet names and sizes\n\
                2. Call `read_spreadsheet` with a sheet name and optionally a range\n\
                \n\
                ## Notes\n\
                - At most {} rows are returned per call; `truncated: true` means more exist\n\
                - A single call builds at most {} cells; narrow wide ranges such as A1:XFD100\n\
                - CSV files must be UTF-8\n\
                - Set `has_header: false` when the first row holds data rather than column names",
                self.handler.max_rows(),
                MAX_CELLS
            )),
        }
    }
}
