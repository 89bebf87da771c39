//! Spreadsheet MCP Server - Main entry point.
//!
//! Serves `list_sheets` and `read_spreadsheet` over stdio.

use clap::Parser;
use pg_sheet_mcp::config::SheetConfig;
use pg_sheet_mcp::logging::init_tracing;
use pg_sheet_mcp::transport::{StdioTransport, Transport};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SheetConfig::parse();
    init_tracing(&config.log);

    info!(
        max_rows = config.max_rows,
        "Starting Spreadsheet MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let max_rows = usize::try_from(config.max_rows).unwrap_or(usize::MAX);
    let transport = StdioTransport::spreadsheet(max_rows);
    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
