//! # Observability Infrastructure
//!
//! Structured logging for the lifecycle operations, built on the tracing
//! ecosystem. Operations emit `debug!`/`info!` events with field lists;
//! private key material never appears in any event (key types redact
//! themselves in `Debug` output).

use tracing_subscriber::EnvFilter;

use crate::errors::ConfigError;

/// Install a global `fmt` subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `default_filter` (e.g. `"certplane=info"`). Fails if a subscriber is
/// already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), ConfigError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| ConfigError::Subscriber { message: e.to_string() })
}
