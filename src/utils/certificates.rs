//! Certificate metadata extraction and signature verification helpers.
//!
//! All DER reading goes through `x509-parser`; this crate never hand-rolls
//! ASN.1. The extracted [`CertificateInfo`] is what the issuance and
//! renewal paths consult for validity, CA flags and path-length budgets.

use chrono::{DateTime, TimeZone, Utc};
use rustls::pki_types::{pem::PemObject, CertificateDer};
use x509_parser::prelude::*;
use x509_parser::time::ASN1Time;

use crate::domain::CertificatePem;
use crate::errors::PkiError;

/// Metadata extracted from a certificate for validation and logging.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    /// Serial number as colon-separated hex.
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub is_ca: bool,
    /// Path-length budget from BasicConstraints; `None` for end-entity
    /// certificates and for unconstrained CAs (see [`CertificateInfo::is_ca`]).
    pub path_len_constraint: Option<u32>,
}

/// Parse the leading certificate of a PEM block into [`CertificateInfo`].
pub fn parse_certificate_info(cert: &CertificatePem) -> Result<CertificateInfo, PkiError> {
    let der = certificate_der(cert)?;
    let (_, x509) = X509Certificate::from_der(der.as_ref())
        .map_err(|e| PkiError::metadata(e.to_string()))?;

    let mut is_ca = false;
    let mut path_len_constraint = None;
    for ext in x509.extensions() {
        if let ParsedExtension::BasicConstraints(bc) = ext.parsed_extension() {
            is_ca = bc.ca;
            path_len_constraint = bc.path_len_constraint;
        }
    }

    let validity = x509.validity();
    Ok(CertificateInfo {
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        serial: x509.raw_serial_as_string(),
        not_before: asn1_time_to_chrono(&validity.not_before)?,
        not_after: asn1_time_to_chrono(&validity.not_after)?,
        is_ca,
        path_len_constraint,
    })
}

/// Verify that `cert`'s signature was produced by the key behind
/// `issuer`'s certificate.
pub fn verify_signed_by(cert: &CertificatePem, issuer: &CertificatePem) -> Result<(), PkiError> {
    let cert_der = certificate_der(cert)?;
    let issuer_der = certificate_der(issuer)?;
    let (_, x509) = X509Certificate::from_der(cert_der.as_ref())
        .map_err(|e| PkiError::metadata(e.to_string()))?;
    let (_, issuer_x509) = X509Certificate::from_der(issuer_der.as_ref())
        .map_err(|e| PkiError::metadata(e.to_string()))?;

    x509.verify_signature(Some(issuer_x509.public_key())).map_err(|_| {
        PkiError::invalid_certificate(format!(
            "signature of '{}' does not verify against issuer '{}'",
            x509.subject(),
            issuer_x509.subject()
        ))
    })
}

/// Verify a leaf-first chain: each certificate must be signed by its
/// successor, and the final certificate must be self-signed (the root).
pub fn verify_chain(chain: &[CertificatePem]) -> Result<(), PkiError> {
    let Some(root) = chain.last() else {
        return Err(PkiError::invalid_certificate("empty certificate chain"));
    };
    for pair in chain.windows(2) {
        verify_signed_by(&pair[0], &pair[1])?;
    }
    verify_signed_by(root, root)
}

/// The subject public key bits of a certificate, for comparing identities
/// across renewals.
pub fn public_key_bits(cert: &CertificatePem) -> Result<Vec<u8>, PkiError> {
    let der = certificate_der(cert)?;
    let (_, x509) = X509Certificate::from_der(der.as_ref())
        .map_err(|e| PkiError::metadata(e.to_string()))?;
    Ok(x509.public_key().subject_public_key.data.to_vec())
}

/// Whether the certificate is inside the renewal window: expired, or
/// expiring within `renewal_days` from now.
pub fn within_renewal_window(info: &CertificateInfo, renewal_days: u32) -> bool {
    Utc::now() + chrono::Duration::days(i64::from(renewal_days)) >= info.not_after
}

/// Decode the first CERTIFICATE block of a PEM into DER.
pub(crate) fn certificate_der(cert: &CertificatePem) -> Result<CertificateDer<'static>, PkiError> {
    CertificateDer::from_pem_slice(cert.as_str().as_bytes()).map_err(|e| {
        PkiError::invalid_certificate_with_source("decode certificate PEM", anyhow::anyhow!(e))
    })
}

fn asn1_time_to_chrono(time: &ASN1Time) -> Result<DateTime<Utc>, PkiError> {
    Utc.timestamp_opt(time.timestamp(), 0)
        .single()
        .ok_or_else(|| PkiError::metadata("certificate time outside representable range"))
}
