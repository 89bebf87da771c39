//! Connection-related data models.
//!
//! `ConnectParams` carries the password and exists only long enough to build a
//! pool and is never serialized. `ConnectionInfo` is the display
//! form that tools return.

use schemars::JsonSchema;
use secrecy::SecretString;
use serde::Serialize;

/// Default PostgreSQL port.
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Parameters for registering a connection.
///
/// The `Debug` output of `SecretString` is redacted, so deriving `Debug` here
/// never prints the password.
#[derive(Debug)]
pub struct ConnectParams {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: SecretString,
}

impl ConnectParams {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The sanitized view of these parameters.
    pub fn display_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
        }
    }
}

/// Connection information returned by tools (no secrets exposed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ConnectionInfo {
    /// Connection name. Use this value in the `connection` parameter of other tools.
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_info_has_no_password() {
        let params = ConnectParams::new("src", "db.local", 5432, "app", "reader", "hunter2");
        let info = params.display_info();
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"name\":\"src\""));
        assert!(json.contains("\"port\":5432"));
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let params = ConnectParams::new("src", "db.local", 5432, "app", "reader", "hunter2");
        let debug = format!("{:?}", params);
        assert!(debug.contains("db.local"));
        assert!(!debug.contains("hunter2"));
    }
}
