//! Error types for key, certificate and CSR lifecycle operations.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced by CA issuance, CSR handling, signing and renewal.
///
/// Every failure is a plain value return; no operation leaves partially
/// written artifacts or substitutes default material.
#[derive(Debug, Error)]
pub enum PkiError {
    /// Key generation failed in the underlying crypto library. Fatal for
    /// the call; callers must not retry with degraded parameters.
    #[error("Key generation failed: {reason}")]
    KeyGeneration { reason: String },

    /// The CSR self-signature does not verify against the public key
    /// embedded in the request. The request is rejected before any of its
    /// content is used.
    #[error("CSR signature does not verify against its embedded public key")]
    InvalidCsrSignature,

    /// A child CA was requested with a path length that does not fit
    /// strictly below the parent's remaining budget.
    #[error("Requested path length {requested} must be strictly less than the parent budget of {parent_budget}")]
    PathLengthViolation { requested: u8, parent_budget: u32 },

    /// The certificate offered as a signing parent is not a CA certificate.
    #[error("Certificate '{subject}' is not a CA certificate")]
    NotACertificateAuthority { subject: String },

    /// The issuer certificate is outside its validity window. Surfaced so
    /// the caller can rotate the CA before issuing.
    #[error("Issuer certificate '{subject}' is not valid now (valid from {not_before} until {not_after})")]
    ExpiredIssuer { subject: String, not_before: DateTime<Utc>, not_after: DateTime<Utc> },

    /// Producing a signature failed in the underlying crypto library.
    #[error("Signing failed: {context}")]
    Signing {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// A certificate PEM could not be parsed.
    #[error("Invalid certificate PEM: {context}")]
    InvalidCertificate {
        context: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A private key PEM could not be parsed or is unsupported. No key
    /// material is echoed in the message.
    #[error("Invalid private key PEM: {context}")]
    InvalidPrivateKey { context: String },

    /// A certificate signing request could not be parsed.
    #[error("Invalid certificate signing request: {context}")]
    InvalidCsr { context: String },

    /// A subject alternative name could not be encoded.
    #[error("Invalid subject alternative name '{name}': {reason}")]
    InvalidSubjectAltName { name: String, reason: String },

    /// notBefore must not be later than notAfter.
    #[error("Invalid validity window: notBefore {not_before} is after notAfter {not_after}")]
    InvalidValidity { not_before: time::OffsetDateTime, not_after: time::OffsetDateTime },

    /// A renewal transition was invoked from the wrong state.
    #[error("Invalid renewal transition: {message}")]
    RenewalState { message: String },

    /// Issuer material on disk could not be read.
    #[error("Failed to read issuer material at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Certificate metadata extraction failed.
    #[error("Failed to extract certificate metadata: {context}")]
    CertificateMetadata { context: String },
}

impl PkiError {
    /// Create a key generation error.
    pub fn key_generation(reason: impl Into<String>) -> Self {
        Self::KeyGeneration { reason: reason.into() }
    }

    /// Create a signing error wrapping the library failure.
    pub fn signing(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Signing { context: context.into(), source: source.into() }
    }

    /// Create a certificate parse error.
    pub fn invalid_certificate(context: impl Into<String>) -> Self {
        Self::InvalidCertificate { context: context.into(), source: None }
    }

    /// Create a certificate parse error with the underlying parser failure.
    pub fn invalid_certificate_with_source(
        context: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::InvalidCertificate { context: context.into(), source: Some(source.into()) }
    }

    /// Create a private key parse error.
    pub fn invalid_private_key(context: impl Into<String>) -> Self {
        Self::InvalidPrivateKey { context: context.into() }
    }

    /// Create a CSR parse error.
    pub fn invalid_csr(context: impl Into<String>) -> Self {
        Self::InvalidCsr { context: context.into() }
    }

    /// Create a renewal state error.
    pub fn renewal_state(message: impl Into<String>) -> Self {
        Self::RenewalState { message: message.into() }
    }

    /// Create a metadata extraction error.
    pub fn metadata(context: impl Into<String>) -> Self {
        Self::CertificateMetadata { context: context.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = PkiError::key_generation("entropy exhausted");
        assert!(matches!(err, PkiError::KeyGeneration { .. }));
        assert_eq!(err.to_string(), "Key generation failed: entropy exhausted");

        let err = PkiError::invalid_csr("missing request block");
        assert!(matches!(err, PkiError::InvalidCsr { .. }));

        let err = PkiError::renewal_state("already renewing");
        assert!(err.to_string().contains("already renewing"));
    }

    #[test]
    fn test_path_length_violation_display() {
        let err = PkiError::PathLengthViolation { requested: 1, parent_budget: 1 };
        assert!(err.to_string().contains("strictly less"));
        assert!(err.to_string().contains('1'));
    }

    #[test]
    fn test_invalid_csr_signature_display() {
        let err = PkiError::InvalidCsrSignature;
        assert!(err.to_string().contains("does not verify"));
    }
}
