pub mod builders;
pub mod fake_collab;
pub mod fake_executor;

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};
use workchain::chain::RetryPolicy;
use workchain::engine::RuntimeOptions;

/// How long any single awaited step of a test may take.
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

static TRACING: OnceLock<()> = OnceLock::new();

/// Route `tracing` output into the libtest capture buffer.
///
/// Filter comes from `RUST_LOG`; only `workchain` warnings otherwise.
/// Safe to call from every test.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,workchain=info"));
        // Another harness may already own the global subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .compact()
            .try_init();
    });
}

/// Await `fut`, panicking if it outlives [`TEST_DEADLINE`].
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_DEADLINE, fut).await {
        Ok(out) => out,
        Err(_) => panic!("still waiting after {TEST_DEADLINE:?}; scheduler stuck?"),
    }
}

/// Retry policy with millisecond delays so retry tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(5), max_retries)
}

pub fn fast_options(max_retries: u32) -> RuntimeOptions {
    RuntimeOptions {
        retry: fast_retry(max_retries),
    }
}
