//! Tracing subscriber setup.
//!
//! stdout carries the MCP protocol, so log output always goes to stderr and is
//! off unless `--enable-logs` is given.

use crate::config::LogArgs;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. Returns false when logging is disabled.
pub fn init_tracing(args: &LogArgs) -> bool {
    if !args.enable_logs {
        return false;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if args.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
    true
}
