//! Process-wide tracing/logging setup.
//!
//! The kernel crates only emit through the `tracing` facade; embedding
//! processes decide where it goes by calling [`init`] (or installing their
//! own subscriber) once at startup.

use tracing_subscriber::EnvFilter;

/// Install the default JSON subscriber, filtered via `RUST_LOG`
/// (default `info`).
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(false)
        .try_init();
}
