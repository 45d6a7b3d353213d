// Tracing initialization with a reloadable log level.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

const DEFAULT_LEVEL: &str = "info";

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

/// Install the global subscriber. `RUST_LOG` wins over the `info` default;
/// the configured level is applied later with [`apply_logging_level`].
pub fn init_tracing() {
    let base_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL));

    let (reload_layer, handle) = reload::Layer::new(base_filter);
    if LOG_RELOAD_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Apply a new logging level at runtime. `RUST_LOG` keeps precedence.
pub fn apply_logging_level(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    if let Some(handle) = LOG_RELOAD_HANDLE.get() {
        let _ = handle.modify(|f| {
            *f = EnvFilter::new(level);
        });
    }
}
