//! Connection registry behavior against a fake connector.
//!
//! The fake hands out in-memory handles, fails the probe for the host
//! `unreachable` and can delay probing or closing to open race windows.

use pg_sheet_mcp::db::{ConnectionRegistry, Connector};
use pg_sheet_mcp::error::{ServerError, ServerResult};
use pg_sheet_mcp::models::ConnectParams;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug)]
struct FakeHandle {
    host: String,
    closed: AtomicBool,
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Default)]
struct FakeConnector {
    counters: Arc<Counters>,
    probe_delay: Duration,
    close_delay: Duration,
}

impl FakeConnector {
    fn with_delays(probe_delay: Duration, close_delay: Duration) -> Self {
        Self {
            counters: Arc::default(),
            probe_delay,
            close_delay,
        }
    }
}

impl Connector for FakeConnector {
    type Handle = Arc<FakeHandle>;

    fn connect(&self, params: &ConnectParams) -> ServerResult<Self::Handle> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeHandle {
            host: params.host.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn probe(&self, handle: &Self::Handle) -> ServerResult<()> {
        tokio::time::sleep(self.probe_delay).await;
        if handle.host == "unreachable" {
            return Err(ServerError::driver(
                "connection refused",
                None,
                "Check network connectivity and database server status",
            ));
        }
        Ok(())
    }

    async fn close(&self, handle: &Self::Handle) {
        tokio::time::sleep(self.close_delay).await;
        handle.closed.store(true, Ordering::SeqCst);
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn params(name: &str, host: &str) -> ConnectParams {
    ConnectParams::new(name, host, 5432, "app", "reader", "hunter2")
}

#[tokio::test]
async fn add_returns_sanitized_info() {
    let registry = ConnectionRegistry::with_connector(FakeConnector::default());
    let info = assert_ok!(registry.add(params("src", "db1")).await);

    assert_eq!(info.name, "src");
    assert_eq!(info.host, "db1");
    let json = serde_json::to_string(&info).unwrap();
    assert!(!json.contains("hunter2"));
    assert!(!json.contains("password"));
}

#[tokio::test]
async fn duplicate_add_keeps_first_registration() {
    let connector = FakeConnector::default();
    let counters = Arc::clone(&connector.counters);
    let registry = ConnectionRegistry::with_connector(connector);

    assert_ok!(registry.add(params("src", "first")).await);
    let err = assert_err!(registry.add(params("src", "second")).await);
    assert!(matches!(err, ServerError::DuplicateName { .. }));

    let list = registry.list().await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].host, "first");
    assert_eq!(assert_ok!(registry.get("src").await).host, "first");
    // Rejected by the early check: no second handle was built.
    assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn names_are_case_sensitive() {
    let registry = ConnectionRegistry::with_connector(FakeConnector::default());
    assert_ok!(registry.add(params("Prod", "a")).await);
    assert_ok!(registry.add(params("prod", "b")).await);
    assert_eq!(registry.names().await, vec!["Prod", "prod"]);
}

#[tokio::test]
async fn failed_probe_registers_nothing() {
    let connector = FakeConnector::default();
    let counters = Arc::clone(&connector.counters);
    let registry = ConnectionRegistry::with_connector(connector);

    let err = assert_err!(registry.add(params("bad", "unreachable")).await);
    assert!(matches!(err, ServerError::ProbeFailed { .. }));
    assert!(err.to_string().contains("connection refused"));
    assert!(!err.to_string().contains("hunter2"));

    assert!(registry.is_empty().await);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);

    // The name is free for a working connection.
    assert_ok!(registry.add(params("bad", "db1")).await);
}

#[tokio::test]
async fn remove_then_get_is_not_found() {
    let registry = ConnectionRegistry::with_connector(FakeConnector::default());
    assert_ok!(registry.add(params("a", "db1")).await);
    assert_ok!(registry.add(params("b", "db2")).await);

    let handle = assert_ok!(registry.get("a").await);
    let removed = assert_ok!(registry.remove("a").await);
    assert_eq!(removed.name, "a");
    assert!(handle.closed.load(Ordering::SeqCst));

    let err = assert_err!(registry.get("a").await);
    assert_eq!(
        err.to_string(),
        "Connection 'a' not found. Registered connections: b"
    );
}

#[tokio::test]
async fn not_found_without_registrations_says_none() {
    let registry = ConnectionRegistry::with_connector(FakeConnector::default());
    let err = assert_err!(registry.get("anything").await);
    assert!(err.to_string().ends_with("Registered connections: none"));
    let err = assert_err!(registry.remove("anything").await);
    assert!(matches!(err, ServerError::ConnectionNotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_adds_register_exactly_one() {
    let connector = FakeConnector::with_delays(Duration::from_millis(50), Duration::ZERO);
    let counters = Arc::clone(&connector.counters);
    let registry = ConnectionRegistry::with_connector(connector);

    let (a, b) = tokio::join!(
        registry.add(params("src", "a")),
        registry.add(params("src", "b"))
    );

    assert_eq!(a.is_ok() as usize + b.is_ok() as usize, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(ServerError::DuplicateName { .. })));
    assert_eq!(registry.len().await, 1);

    // Every handle that did not end up registered was closed.
    assert_eq!(
        counters.opened.load(Ordering::SeqCst) - 1,
        counters.closed.load(Ordering::SeqCst)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn name_is_reserved_until_close_finishes() {
    let connector = FakeConnector::with_delays(Duration::ZERO, Duration::from_millis(300));
    let registry = Arc::new(ConnectionRegistry::with_connector(connector));
    assert_ok!(registry.add(params("src", "old")).await);

    let removing = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.remove("src").await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = assert_err!(registry.get("src").await);
    assert!(matches!(err, ServerError::ConnectionNotFound { .. }));
    let err = assert_err!(registry.add(params("src", "new")).await);
    assert!(matches!(err, ServerError::DuplicateName { .. }));

    assert_ok!(removing.await.unwrap());
    let info = assert_ok!(registry.add(params("src", "new")).await);
    assert_eq!(info.host, "new");
}

#[tokio::test]
async fn cancelled_remove_still_closes_and_frees_the_name() {
    let connector = FakeConnector::with_delays(Duration::ZERO, Duration::from_millis(200));
    let counters = Arc::clone(&connector.counters);
    let registry = ConnectionRegistry::with_connector(connector);
    assert_ok!(registry.add(params("src", "old")).await);

    // The caller gives up while the handle is still closing.
    let cancelled = tokio::time::timeout(Duration::from_millis(10), registry.remove("src")).await;
    assert!(cancelled.is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    let info = assert_ok!(registry.add(params("src", "new")).await);
    assert_eq!(info.host, "new");
}

#[tokio::test]
async fn get_and_list_do_not_wait_for_slow_probe() {
    let connector = FakeConnector::with_delays(Duration::from_millis(500), Duration::ZERO);
    let registry = Arc::new(ConnectionRegistry::with_connector(connector));

    let adding = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.add(params("slow", "db")).await })
    };
    tokio::task::yield_now().await;

    let listed = tokio::time::timeout(Duration::from_millis(100), registry.list()).await;
    assert!(listed.is_ok(), "list blocked behind a probe");
    assert!(listed.unwrap().is_empty());

    assert_ok!(adding.await.unwrap());
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn close_all_closes_everything_and_is_repeatable() {
    let connector = FakeConnector::default();
    let counters = Arc::clone(&connector.counters);
    let registry = ConnectionRegistry::with_connector(connector);

    for name in ["a", "b", "c"] {
        assert_ok!(registry.add(params(name, "db")).await);
    }

    registry.close_all().await;
    assert!(registry.is_empty().await);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 3);

    registry.close_all().await;
    assert_eq!(counters.closed.load(Ordering::SeqCst), 3);

    // Names are free again.
    assert_ok!(registry.add(params("a", "db")).await);
}
