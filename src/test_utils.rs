//! Structured logging helpers for tests.
//!
//! ```ignore
//! fn init_test(name: &str) {
//!     mocktrail::test_utils::init_test_logging();
//!     mocktrail::test_phase!(name);
//! }
//! ```
//!
//! `RUST_LOG` overrides the default `mocktrail=debug` filter.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a test-writer `fmt` subscriber once per process.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mocktrail=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .compact()
            .try_init();
    });
}

/// Logs the start of a test phase.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {{
        let name = &$name;
        $crate::__tracing::info!(phase = %name, "test phase started");
    }};
}

/// Logs the successful end of a test.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {{
        let name = &$name;
        $crate::__tracing::info!(test = %name, "test completed");
    }};
}

/// Asserts `cond`, logging the expectation and the observed value first.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr $(,)?) => {{
        let msg = &$msg;
        let expected = &$expected;
        let actual = &$actual;
        $crate::__tracing::debug!(
            check = %msg,
            expected = ?expected,
            actual = ?actual,
            "asserting"
        );
        assert!($cond, "{}: expected {:?}, got {:?}", msg, expected, actual);
    }};
}
