//! Shared helpers for the `pipespawn` integration tests.
//!
//! - [`builders`]: shell-command builders and launch-config fixtures.
//! - [`io`]: deadline-bounded reads from child endpoints.

pub mod builders;
pub mod io;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Longest any async test step may take.
pub const ASYNC_DEADLINE: Duration = Duration::from_secs(5);

/// Install a per-test tracing subscriber once per test binary.
///
/// Output goes through the test writer, so it shows up only for failing
/// tests (or with `--nocapture`). The default filter keeps the crate's
/// spawn and reap events and silences dependencies; narrow or widen it with
/// `RUST_LOG`, e.g. `RUST_LOG=pipespawn::poll=trace`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,pipespawn=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if a child never answers within
/// [`ASYNC_DEADLINE`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(ASYNC_DEADLINE, f)
        .await
        .expect("child did not respond within the async deadline")
}
