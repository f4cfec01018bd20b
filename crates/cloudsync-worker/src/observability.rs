//! Log output of the worker process.
//!
//! The subscriber is installed before the config file is read, at a bootstrap
//! level. Its filter sits behind a reload layer so `[logging] level` can take
//! over once the file is loaded. `RUST_LOG` always wins over both.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

const BOOTSTRAP_LEVEL: &str = "info";

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let (filter, handle) = reload::Layer::new(filter_for(BOOTSTRAP_LEVEL));
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

/// Switches the worker to the configured level.
///
/// Returns `false` when the level was not applied: `RUST_LOG` is set or the
/// subscriber was never installed.
pub fn apply_logging_level(level: &str) -> bool {
    if rust_log_is_set() {
        return false;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };
    handle.modify(|filter| *filter = EnvFilter::new(level)).is_ok()
}

fn filter_for(level: &str) -> EnvFilter {
    if rust_log_is_set() {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::new(level)
}

fn rust_log_is_set() -> bool {
    std::env::var_os(EnvFilter::DEFAULT_ENV).is_some()
}
