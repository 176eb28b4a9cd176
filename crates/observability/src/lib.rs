//! Logging setup shared by binaries and tests.

/// Initialize process-wide logging with the `info` default filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    self::tracing::init_with("info");
}

pub use self::tracing::{init_for_tests, init_with};

/// Subscriber configuration (filters, layers).
pub mod tracing;
