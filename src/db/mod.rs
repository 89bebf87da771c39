//! Database access layer.
//!
//! - Connection registry and handle construction
//! - Read-only query execution
//! - Schema introspection
//! - Type mappings and identifier quoting

pub mod connector;
pub mod executor;
pub mod ident;
pub mod registry;
pub mod schema;
pub mod types;

pub use connector::{CONNECT_TIMEOUT, Connector, IDLE_TIMEOUT, MAX_CONNECTIONS, PgConnector};
pub use executor::QueryExecutor;
pub use ident::{qualified_name, quote_ident};
pub use registry::ConnectionRegistry;
pub use schema::SchemaInspector;
