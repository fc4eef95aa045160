// src/telemetry.rs
//! Process-wide tracing setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::ingest::config::LoggingConfig;

/// Install the global subscriber once.
///
/// `RUST_LOG` wins over `logging.level`; `verbose` bumps the fallback to
/// debug. A second call (tests, embedding) is a no-op.
pub fn init(cfg: &LoggingConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { cfg.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if cfg.json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
