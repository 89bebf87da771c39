//! Connection management tools.
//!
//! This module implements `add_connection`, `remove_connection` and
//! `list_connections`.

use crate::db::ConnectionRegistry;
use crate::error::ServerResult;
use crate::models::{ConnectParams, ConnectionInfo, DEFAULT_PG_PORT};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_port() -> u16 {
    DEFAULT_PG_PORT
}

/// Input for the add_connection tool.
///
/// No `Debug` derive: the password must not end up in logs.
#[derive(Clone, Deserialize, JsonSchema)]
pub struct AddConnectionInput {
    /// Name used to refer to this connection in other tools. Case-sensitive.
    pub name: String,
    /// Database server host name or IP address
    pub host: String,
    /// Database server port. Default: 5432
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name
    pub database: String,
    /// Login role
    pub user: String,
    /// Password for the role. Used once to connect; never stored or returned.
    #[serde(default)]
    pub password: String,
}

impl From<AddConnectionInput> for ConnectParams {
    fn from(input: AddConnectionInput) -> Self {
        ConnectParams::new(
            input.name,
            input.host,
            input.port,
            input.database,
            input.user,
            input.password,
        )
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveConnectionInput {
    /// Name of the connection to remove
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveConnectionOutput {
    pub removed: bool,
    pub connection: ConnectionInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListConnectionsOutput {
    pub connections: Vec<ConnectionInfo>,
    pub count: usize,
}

pub struct ConnectionToolHandler {
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn add_connection(&self, input: AddConnectionInput) -> ServerResult<ConnectionInfo> {
        self.registry.add(input.into()).await
    }

    pub async fn remove_connection(
        &self,
        input: RemoveConnectionInput,
    ) -> ServerResult<RemoveConnectionOutput> {
        let connection = self.registry.remove(&input.name).await?;
        Ok(RemoveConnectionOutput {
            removed: true,
            connection,
        })
    }

    pub async fn list_connections(&self) -> ListConnectionsOutput {
        let connections = self.registry.list().await;
        let count = connections.len();
        ListConnectionsOutput { connections, count }
    }
}
