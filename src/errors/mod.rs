//! # Error Handling
//!
//! Error types for the certplane identity lifecycle library, defined with
//! `thiserror`. Each concern carries its own enum: [`PkiError`] for key,
//! certificate and CSR operations, [`StoreError`] for sealed key/trust
//! store assembly, and [`ConfigError`] for settings loading.

pub mod pki;
pub mod store;

pub use pki::PkiError;
pub use store::StoreError;

use thiserror::Error;

/// Errors raised while loading settings or initializing the tracing stack.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    /// The global tracing subscriber could not be installed.
    #[error("Failed to install tracing subscriber: {message}")]
    Subscriber { message: String },
}

impl ConfigError {
    /// Create an invalid-value error for an environment variable.
    pub fn invalid_value(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue { var: var.into(), reason: reason.into() }
    }
}
