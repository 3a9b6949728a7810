// src/logging.rs

//! Logging setup for hosts that do not install their own subscriber

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`
///
/// Without `RUST_LOG` the level is `info`, or `debug` when `verbose` is
/// set. Does nothing if a global subscriber is already installed.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .try_init();
}
