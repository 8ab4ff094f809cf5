//! Tracing bootstrap for hosts embedding this crate.
//!
//! The core itself only ever calls [`tracing::debug!`]/[`tracing::warn!`] — it
//! never installs a subscriber, since that's a host-level decision (stdout,
//! log file, or nothing at all). [`init_stdout`] is a convenience for hosts
//! that don't want to pull in `tracing-subscriber` themselves.

use tracing_subscriber::EnvFilter;

/// Install a stdout subscriber filtered by `RUST_LOG` (defaults to `warn`).
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_stdout() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
