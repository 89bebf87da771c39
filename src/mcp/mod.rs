//! MCP server integration module.
//!
//! Binds the tool handlers to the rmcp framework: one service per binary,
//! plus the shared conversion of handler results into tool results.

pub mod postgres;
pub mod response;
pub mod spreadsheet;

pub use postgres::PgService;
pub use spreadsheet::SheetService;
