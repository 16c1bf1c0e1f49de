//! CA issuer: root and intermediate CA generation, self-signed renewal.
//!
//! Root CAs are self-signed with an explicit validity window and
//! path-length budget; intermediates are signed by a parent CA after the
//! child's path length has been checked strictly against the parent's
//! remaining budget. Renewal regenerates only the certificate body and
//! signature so the CA's public identity survives rotation and trust
//! stores holding the old certificate stay valid during the overlap
//! window.

use rcgen::{
    BasicConstraints, CertificateParams, IsCa, Issuer, KeyPair, KeyUsagePurpose,
    PKCS_ECDSA_P256_SHA256,
};
use tracing::info;

use crate::domain::{Ca, CertificatePem, CertifiedKey, PrivateKeyPem, Subject, ValidityWindow};
use crate::errors::PkiError;
use crate::pki::signer::random_serial;
use crate::utils::certificates::parse_certificate_info;

/// Generate a fresh keypair and a self-signed root CA certificate.
///
/// `path_length` bounds how many intermediate CAs may chain below this
/// root; `0` means the root may only issue end-entity certificates.
pub fn generate_root_ca(
    subject: &Subject,
    window: &ValidityWindow,
    path_length: u8,
) -> Result<Ca, PkiError> {
    let key_pair = generate_ca_key_pair()?;
    let params = ca_params(subject, window, path_length)?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| PkiError::signing("self-sign root CA certificate", e))?;

    info!(subject = %subject, path_length, "Generated root CA");
    Ok(Ca {
        key: PrivateKeyPem::from_generated(key_pair.serialize_pem()),
        cert: CertificatePem::from_generated(cert.pem()),
    })
}

/// Generate a fresh keypair and a CA certificate signed by `parent`.
///
/// The child's `path_length` must be strictly less than the parent's
/// remaining budget; an unconstrained parent admits any child budget.
pub fn generate_intermediate_ca(
    parent: &Ca,
    subject: &Subject,
    window: &ValidityWindow,
    path_length: u8,
) -> Result<Ca, PkiError> {
    let parent_info = parse_certificate_info(&parent.cert)?;
    if !parent_info.is_ca {
        return Err(PkiError::NotACertificateAuthority { subject: parent_info.subject });
    }
    if let Some(budget) = parent_info.path_len_constraint {
        if u32::from(path_length) >= budget {
            return Err(PkiError::PathLengthViolation {
                requested: path_length,
                parent_budget: budget,
            });
        }
    }

    let key_pair = generate_ca_key_pair()?;
    let mut params = ca_params(subject, window, path_length)?;
    params.use_authority_key_identifier_extension = true;

    let parent_key = KeyPair::from_pem(parent.key.expose())
        .map_err(|e| PkiError::invalid_private_key(e.to_string()))?;
    let issuer = Issuer::from_ca_cert_pem(parent.cert.as_str(), parent_key).map_err(|e| {
        PkiError::invalid_certificate_with_source("load parent CA certificate", e)
    })?;

    let cert = params
        .signed_by(&key_pair, &issuer)
        .map_err(|e| PkiError::signing("sign intermediate CA certificate", e))?;

    info!(
        subject = %subject,
        issuer = %parent_info.subject,
        path_length,
        "Generated intermediate CA"
    );
    Ok(Ca {
        key: PrivateKeyPem::from_generated(key_pair.serialize_pem()),
        cert: CertificatePem::from_generated(cert.pem()),
    })
}

/// Re-issue a self-signed CA certificate over an existing private key.
///
/// Only the certificate body and signature are regenerated; the keypair,
/// and with it the CA's public identity, is preserved. Callers publish the
/// old and new certificates side by side during the rotation overlap
/// window.
pub fn renew_self_signed(
    key: &PrivateKeyPem,
    subject: &Subject,
    window: &ValidityWindow,
    path_length: u8,
) -> Result<CertificatePem, PkiError> {
    let key_pair = KeyPair::from_pem(key.expose())
        .map_err(|e| PkiError::invalid_private_key(e.to_string()))?;
    let params = ca_params(subject, window, path_length)?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| PkiError::signing("re-sign self-signed certificate", e))?;

    info!(subject = %subject, "Renewed self-signed certificate, private key preserved");
    Ok(CertificatePem::from_generated(cert.pem()))
}

/// Generate a standalone self-signed identity valid for `days` days.
///
/// Issued as a zero-path-length authority: it can anchor its own trust but
/// never sign a further CA.
pub fn generate_self_signed_cert(subject: &Subject, days: u32) -> Result<CertifiedKey, PkiError> {
    let window = ValidityWindow::days_from_now(days);
    let ca = generate_root_ca(subject, &window, 0)?;
    Ok(CertifiedKey { key: ca.key, cert: ca.cert })
}

fn generate_ca_key_pair() -> Result<KeyPair, PkiError> {
    KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
        .map_err(|e| PkiError::key_generation(e.to_string()))
}

fn ca_params(
    subject: &Subject,
    window: &ValidityWindow,
    path_length: u8,
) -> Result<CertificateParams, PkiError> {
    let mut params = CertificateParams::default();
    params.distinguished_name = subject.to_distinguished_name();
    params.subject_alt_names = subject.to_subject_alt_names()?;
    params.is_ca = IsCa::Ca(BasicConstraints::Constrained(path_length));
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params.not_before = window.not_before();
    params.not_after = window.not_after();
    params.serial_number = Some(random_serial()?);
    Ok(params)
}
