//! Named connection registry.
//!
//! Maps caller-chosen names to live handles plus their display info. The lock
//! is only held for map bookkeeping; connecting, probing and closing all run
//! outside it, so a slow server never blocks `get` or `list` on other names.
//!
//! A removed name stays reserved until its handle has finished closing, which
//! keeps a fresh `add` from racing the teardown of the old pool. Closing runs
//! on a spawned task, so a cancelled `remove` still finishes and frees the name.

use crate::db::connector::{Connector, PgConnector};
use crate::error::{ServerError, ServerResult};
use crate::models::{ConnectParams, ConnectionInfo};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

struct Entry<H> {
    info: ConnectionInfo,
    handle: H,
}

struct State<H> {
    /// Insertion order is the `list` order.
    entries: Vec<Entry<H>>,
    /// Names whose handle is being closed.
    releasing: HashSet<String>,
}

impl<H> State<H> {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.info.name == name)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.position(name).is_some() || self.releasing.contains(name)
    }

    fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.info.name.clone()).collect()
    }
}

pub struct ConnectionRegistry<C: Connector = PgConnector> {
    connector: Arc<C>,
    state: Arc<RwLock<State<C::Handle>>>,
}

impl ConnectionRegistry<PgConnector> {
    pub fn new() -> Self {
        Self::with_connector(PgConnector)
    }
}

impl Default for ConnectionRegistry<PgConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ConnectionRegistry<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            state: Arc::new(RwLock::new(State {
                entries: Vec::new(),
                releasing: HashSet::new(),
            })),
        }
    }

    /// Build a handle, probe it and register it under `params.name`.
    ///
    /// Nothing is registered unless the probe succeeds.
    pub async fn add(&self, params: ConnectParams) -> ServerResult<ConnectionInfo> {
        let name = params.name.clone();

        // Early check for existing connection
        {
            let state = self.state.read().await;
            if state.is_taken(&name) {
                return Err(ServerError::duplicate_name(name));
            }
        }

        info!(
            connection = %name,
            host = %params.host,
            port = params.port,
            database = %params.database,
            user = %params.user,
            "Adding connection"
        );

        let handle = self.connector.connect(&params)?;
        if let Err(e) = self.connector.probe(&handle).await {
            warn!(connection = %name, error = %e, "Liveness probe failed");
            self.connector.close(&handle).await;
            return Err(ServerError::probe_failed(name, e.to_string()));
        }

        let info = params.display_info();
        drop(params);

        // Re-check after async work to prevent TOCTOU race
        let rejected = {
            let mut state = self.state.write().await;
            if state.is_taken(&name) {
                Some(handle)
            } else {
                state.entries.push(Entry {
                    info: info.clone(),
                    handle,
                });
                None
            }
        };

        if let Some(handle) = rejected {
            self.connector.close(&handle).await;
            return Err(ServerError::duplicate_name(name));
        }

        info!(connection = %name, "Connection added");
        Ok(info)
    }

    /// Unregister `name` and close its handle.
    ///
    /// `get` fails for the name as soon as this starts; the name can be reused
    /// once the handle is closed.
    pub async fn remove(&self, name: &str) -> ServerResult<ConnectionInfo> {
        let entry = {
            let mut state = self.state.write().await;
            let Some(pos) = state.position(name) else {
                return Err(ServerError::connection_not_found(name, &state.names()));
            };
            let entry = state.entries.remove(pos);
            state.releasing.insert(name.to_string());
            entry
        };

        let info = entry.info.clone();
        self.release(vec![entry]).await?;
        info!(connection = %name, "Connection removed");
        Ok(info)
    }

    /// Clone of the handle registered under `name`.
    pub async fn get(&self, name: &str) -> ServerResult<C::Handle> {
        let state = self.state.read().await;
        match state.position(name) {
            Some(pos) => Ok(state.entries[pos].handle.clone()),
            None => Err(ServerError::connection_not_found(name, &state.names())),
        }
    }

    /// Display info of every registration, in insertion order.
    pub async fn list(&self) -> Vec<ConnectionInfo> {
        let state = self.state.read().await;
        state.entries.iter().map(|e| e.info.clone()).collect()
    }

    pub async fn names(&self) -> Vec<String> {
        self.state.read().await.names()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Drain every entry and close all handles concurrently.
    pub async fn close_all(&self) {
        let drained: Vec<Entry<C::Handle>> = {
            let mut state = self.state.write().await;
            let drained: Vec<_> = state.entries.drain(..).collect();
            for entry in &drained {
                state.releasing.insert(entry.info.name.clone());
            }
            drained
        };

        if drained.is_empty() {
            return;
        }

        let count = drained.len();
        if let Err(e) = self.release(drained).await {
            warn!(error = %e, "Failed to close connections");
            return;
        }
        info!(count, "All connections closed");
    }

    /// Close the handles of `entries` and then free their reserved names.
    ///
    /// The work runs on its own task, so it completes even if the caller's
    /// future is dropped mid-close.
    async fn release(&self, entries: Vec<Entry<C::Handle>>) -> ServerResult<()> {
        let connector = Arc::clone(&self.connector);
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            join_all(entries.iter().map(|entry| {
                info!(connection = %entry.info.name, "Closing connection");
                connector.close(&entry.handle)
            }))
            .await;

            let mut state = state.write().await;
            for entry in &entries {
                state.releasing.remove(&entry.info.name);
            }
        });

        task.await
            .map_err(|e| ServerError::internal(format!("Connection close task failed: {}", e)))
    }
}
