//! PostgreSQL and spreadsheet MCP servers.
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to inspect PostgreSQL databases through named, read-only connections and to
//! read xlsx, xls, ods and csv files.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod sheet;
pub mod tools;
pub mod transport;

pub use config::{PgConfig, SheetConfig};
pub use db::ConnectionRegistry;
pub use error::{ServerError, ServerResult};
pub use mcp::{PgService, SheetService};
