//! Transport layer for the MCP servers.
//!
//! Both servers speak MCP over standard input/output.

pub mod stdio;

pub use stdio::StdioTransport;

use crate::error::ServerResult;
use std::future::Future;

/// Trait for MCP transport implementations.
pub trait Transport: Send + Sync {
    /// Serve requests until the client disconnects or a shutdown signal arrives.
    fn run(&self) -> impl Future<Output = ServerResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
