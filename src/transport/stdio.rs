//! Stdio transport for the MCP servers.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::db::ConnectionRegistry;
use crate::error::{ServerError, ServerResult};
use crate::mcp::{PgService, SheetService};
use crate::transport::Transport;
use rmcp::{ServerHandler, ServiceExt, transport::stdio};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Serves one MCP service over stdin/stdout.
///
/// When a registry is attached, every connection in it is closed on shutdown.
pub struct StdioTransport<S> {
    service: S,
    registry: Option<Arc<ConnectionRegistry>>,
}

impl StdioTransport<PgService> {
    pub fn postgres(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            service: PgService::new(registry.clone()),
            registry: Some(registry),
        }
    }
}

impl StdioTransport<SheetService> {
    pub fn spreadsheet(max_rows: usize) -> Self {
        Self {
            service: SheetService::new(max_rows),
            registry: None,
        }
    }
}

impl<S> StdioTransport<S> {
    async fn close_connections(&self) {
        if let Some(registry) = &self.registry {
            let count = registry.len().await;
            info!(count, "Closing all database connections");
            registry.close_all().await;
        }
    }
}

impl<S> Transport for StdioTransport<S>
where
    S: ServerHandler + Clone,
{
    async fn run(&self) -> ServerResult<()> {
        info!("Starting MCP server with stdio transport");

        let running_service = self
            .service
            .clone()
            .serve(stdio())
            .await
            .map_err(|e| {
                ServerError::internal(format!("Failed to start stdio transport: {}", e))
            })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.close_connections().await;
                        return Err(ServerError::internal(format!(
                            "Stdio transport error: {}",
                            e
                        )));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        self.close_connections().await;

        if shutdown_requested {
            // A blocking stdin read cannot be interrupted from here.
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
