//! Error types for sealed key store and trust store assembly.

use thiserror::Error;

/// Errors raised while building, opening or editing password-sealed
/// key/trust store containers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store manifest could not be serialized. Fatal for this call,
    /// safe to retry with fresh inputs.
    #[error("Store encoding failed: {context}")]
    Encoding {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The alias already exists and the caller requested non-overwrite
    /// semantics.
    #[error("Alias '{alias}' already exists in the store")]
    DuplicateAlias { alias: String },

    /// The password did not authenticate the sealed container, or the
    /// ciphertext was tampered with. Never returns an empty store.
    #[error("Store could not be unsealed: wrong password or corrupted container")]
    WrongPassword,

    /// The container bytes are not a valid sealed store.
    #[error("Malformed store container: {reason}")]
    Malformed { reason: String },

    /// The system randomness source failed while sealing.
    #[error("Failed to gather randomness for store sealing")]
    Randomness,

    /// The AEAD seal operation failed.
    #[error("Store sealing failed")]
    Sealing,
}

impl StoreError {
    /// Create an encoding error wrapping the serializer failure.
    pub fn encoding(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encoding { context: context.into(), source }
    }

    /// Create a duplicate alias error.
    pub fn duplicate_alias(alias: impl Into<String>) -> Self {
        Self::DuplicateAlias { alias: alias.into() }
    }

    /// Create a malformed container error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed { reason: reason.into() }
    }
}
