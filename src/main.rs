//! PostgreSQL MCP Server - Main entry point.
//!
//! Serves read-only PostgreSQL inspection tools over stdio. Connections given
//! with `--connection` are registered (and probed) before serving starts.

use clap::Parser;
use pg_sheet_mcp::config::PgConfig;
use pg_sheet_mcp::db::ConnectionRegistry;
use pg_sheet_mcp::logging::init_tracing;
use pg_sheet_mcp::transport::{StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PgConfig::parse();
    init_tracing(&config.log);

    info!("Starting PostgreSQL MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(ConnectionRegistry::new());

    let preconfigured = config.parse_connections()?;
    if !preconfigured.is_empty() {
        info!(
            count = preconfigured.len(),
            "Registering preconfigured connections"
        );
    }

    for params in preconfigured {
        let name = params.name.clone();
        match registry.add(params).await {
            Ok(connection) => info!(
                connection = %connection.name,
                host = %connection.host,
                database = %connection.database,
                "Connection registered"
            ),
            Err(e) => {
                error!(connection = %name, error = %e, "Failed to register connection");
                registry.close_all().await;
                return Err(e.into());
            }
        }
    }

    let transport = StdioTransport::postgres(registry);
    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
