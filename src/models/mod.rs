//! Data models shared by the tools.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectParams, ConnectionInfo, DEFAULT_PG_PORT};
pub use query::{
    ColumnMetadata, DEFAULT_ROW_LIMIT, DEFAULT_SAMPLE_LIMIT, MAX_ROW_LIMIT, MAX_SAMPLE_LIMIT,
    QueryParam, QueryRequest, QueryResult,
};
pub use schema::{
    ColumnDefinition, ForeignKey, ForeignKeyAction, IndexInfo, TableInfo, TableSchema, TableType,
};
