//! Logging initialization
//!
//! Thin wrapper around tracing-subscriber so the binary and tests share
//! one initialization path.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` when set, defaulting to `info` for the crate and
/// `warn` for everything else. Safe to call once per process.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,asin_tracker=info,tracker=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}
