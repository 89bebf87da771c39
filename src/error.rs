//! Error types shared by both servers.
//!
//! Every failure a tool call can hit is one `ServerError` variant. Variants carry
//! enough context for an assistant to recover (available names, the rule that
//! rejected a query, the offending extension) and some carry a suggestion.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Connection '{name}' already exists")]
    DuplicateName { name: String },

    #[error("Connection '{name}' not found. Registered connections: {available}")]
    ConnectionNotFound { name: String, available: String },

    #[error("Sheet '{sheet}' not found. Available sheets: {available}")]
    SheetNotFound { sheet: String, available: String },

    #[error("{kind} '{name}' not found")]
    ObjectNotFound { kind: String, name: String },

    #[error("Query is not read-only: {reason}")]
    NotReadOnly { reason: String },

    #[error("Unsupported file format '{extension}'. Supported formats: .xlsx, .xls, .csv, .ods")]
    UnsupportedFormat { extension: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Connection '{name}' failed liveness probe: {message}")]
    ProbeFailed { name: String, message: String },

    #[error("Database error: {message}{}", sql_state_suffix(.sql_state))]
    Driver {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn sql_state_suffix(sql_state: &Option<String>) -> String {
    match sql_state {
        Some(code) => format!(" (SQLSTATE: {})", code),
        None => String::new(),
    }
}

/// Render a list of names for error messages, or "none" when empty.
pub fn format_available<S: AsRef<str>>(names: &[S]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names
            .iter()
            .map(|n| n.as_ref())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ServerError {
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create a connection not found error listing the registered names.
    pub fn connection_not_found<S: AsRef<str>>(name: impl Into<String>, registered: &[S]) -> Self {
        Self::ConnectionNotFound {
            name: name.into(),
            available: format_available(registered),
        }
    }

    /// Create a sheet not found error listing the sheets in the workbook.
    pub fn sheet_not_found<S: AsRef<str>>(sheet: impl Into<String>, available: &[S]) -> Self {
        Self::SheetNotFound {
            sheet: sheet.into(),
            available: format_available(available),
        }
    }

    pub fn object_not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn not_read_only(reason: impl Into<String>) -> Self {
        Self::NotReadOnly {
            reason: reason.into(),
        }
    }

    pub fn unsupported_format(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn probe_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProbeFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a driver error with optional SQL state.
    pub fn driver(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Driver {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Driver { suggestion, .. } => Some(suggestion),
            Self::DuplicateName { .. } => {
                Some("Remove the existing connection first or choose a different name")
            }
            Self::ConnectionNotFound { .. } => {
                Some("Call list_connections or add_connection to register the connection")
            }
            Self::NotReadOnly { .. } => {
                Some("Only SELECT, WITH and EXPLAIN statements without write keywords are accepted")
            }
            Self::ProbeFailed { .. } => Some(
                "Check host, port, database, user and password, and that the server accepts connections",
            ),
            Self::SheetNotFound { .. } => Some("Call list_sheets to see the sheet names"),
            _ => None,
        }
    }

    /// SQLSTATE code reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Driver { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

/// Convert sqlx errors to ServerError.
impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => ServerError::driver(
                msg.to_string(),
                None,
                "Check the connection parameters",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                ServerError::driver(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => ServerError::driver(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => ServerError::driver(
                "Timed out acquiring a connection from the pool",
                None,
                "Check that the database server is reachable and not overloaded",
            ),
            sqlx::Error::PoolClosed => ServerError::driver(
                "Connection pool is closed",
                None,
                "The connection was removed; add it again to continue",
            ),
            sqlx::Error::Io(io_err) => ServerError::driver(
                format!("I/O error: {}", io_err),
                None,
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => ServerError::driver(
                format!("TLS error: {}", tls_err),
                None,
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => ServerError::driver(
                format!("Protocol error: {}", msg),
                None,
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => {
                ServerError::object_not_found("Type", type_name)
            }
            sqlx::Error::ColumnNotFound(col) => ServerError::object_not_found("Column", col),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => ServerError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                ServerError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                ServerError::internal(format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => ServerError::internal("Database worker crashed"),
            _ => ServerError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<calamine::Error> for ServerError {
    fn from(err: calamine::Error) -> Self {
        ServerError::parse(format!("Failed to read workbook: {}", err))
    }
}

impl From<csv::Error> for ServerError {
    fn from(err: csv::Error) -> Self {
        ServerError::parse(format!("Failed to read CSV: {}", err))
    }
}

/// Result type alias used across the crate.
pub type ServerResult<T> = Result<T, ServerError>;
