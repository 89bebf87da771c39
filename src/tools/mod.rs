//! MCP tool implementations.
//!
//! PostgreSQL tool handlers:
//! - `connection`: add_connection, remove_connection, list_connections
//! - `query`: read-only query execution
//! - `schema`: schema, table, index and foreign key inspection, sample rows, row counts
//! - `compare`: the same inspection fanned out over several connections
//! - `sql_guard`: keyword check applied before a query reaches the database
//!
//! Spreadsheet tool handlers:
//! - `spreadsheet`: list_sheets, read_spreadsheet

pub mod compare;
pub mod connection;
pub mod query;
pub mod schema;
pub mod spreadsheet;
pub mod sql_guard;

pub use compare::{
    CompareRowCountsInput, CompareRowCountsOutput, CompareSchemasInput, CompareSchemasOutput,
    CompareToolHandler,
};
pub use connection::{
    AddConnectionInput, ConnectionToolHandler, ListConnectionsOutput, RemoveConnectionInput,
    RemoveConnectionOutput,
};
pub use query::{QueryInput, QueryOutput, QueryToolHandler};
pub use schema::{
    ConnectionInput, DescribeTableOutput, ListTablesInput, ListTablesOutput, SampleRowsInput,
    SchemaToolHandler, TableInput,
};
pub use spreadsheet::{
    ListSheetsInput, ReadSpreadsheetInput, ReadSpreadsheetOutput, SpreadsheetToolHandler,
};
