//! Handle construction for registry entries.
//!
//! The registry only needs three things from a database handle: build it from
//! connection parameters, check that it answers, and close it. `Connector`
//! captures exactly that so the registry can be exercised without a server.

use crate::error::ServerResult;
use crate::models::ConnectParams;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::future::Future;
use std::time::Duration;

/// Maximum pooled connections per registered name.
pub const MAX_CONNECTIONS: u32 = 5;

/// Idle connections are closed after this long.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound on establishing/acquiring a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const APPLICATION_NAME: &str = "pg-mcp-server";

/// Builds, probes and closes database handles.
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    /// Construct a handle. Must not perform network I/O.
    fn connect(&self, params: &ConnectParams) -> ServerResult<Self::Handle>;

    /// Trivial liveness check.
    fn probe(&self, handle: &Self::Handle) -> impl Future<Output = ServerResult<()>> + Send;

    /// Release the handle, waiting for in-flight work to drain.
    fn close(&self, handle: &Self::Handle) -> impl Future<Output = ()> + Send;
}

/// Production connector backed by a lazily connecting `PgPool`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

impl PgConnector {
    fn connect_options(params: &ConnectParams) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.database)
            .username(&params.user)
            .password(params.password.expose_secret())
            .application_name(APPLICATION_NAME)
    }
}

impl Connector for PgConnector {
    type Handle = PgPool;

    fn connect(&self, params: &ConnectParams) -> ServerResult<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(0)
            .idle_timeout(Some(IDLE_TIMEOUT))
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_lazy_with(Self::connect_options(params));
        Ok(pool)
    }

    async fn probe(&self, handle: &PgPool) -> ServerResult<()> {
        sqlx::query("SELECT 1").execute(handle).await?;
        Ok(())
    }

    async fn close(&self, handle: &PgPool) {
        handle.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_carry_params() {
        let params = ConnectParams::new("src", "db.internal", 6543, "shop", "reader", "pw");
        let options = PgConnector::connect_options(&params);
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("shop"));
        assert_eq!(options.get_username(), "reader");
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        // Nothing listens on port 1; building the pool must still succeed.
        let params = ConnectParams::new("src", "127.0.0.1", 1, "db", "user", "pw");
        let pool = PgConnector.connect(&params).unwrap();
        assert_eq!(pool.size(), 0);
        PgConnector.close(&pool).await;
        assert!(pool.is_closed());
    }
}
