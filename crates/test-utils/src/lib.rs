//! Shared helpers for pipedag's integration tests: tracing setup, a timeout
//! wrapper for event-loop tests, the [`fake_executor::FakeExecutor`] backend
//! and builders for templates, tasks and sample sheets.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install the tracing subscriber once per test binary.
///
/// Uses the test writer, so output only shows up for failing tests (or with
/// `-- --nocapture`). `RUST_LOG` selects the level, defaulting to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Bound a future so a wedged event loop fails the test instead of hanging
/// the whole suite.
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("future did not finish within 5s")
}
