//! Cert signer: CSR validation and end-entity certificate issuance.
//!
//! A [`CertSigner`] owns one CA's material plus the serial allocator for
//! every certificate that CA issues, so concurrent reconciliation workers
//! sharing a signer can never collide on serial numbers. CA material is
//! reached through the [`IssuerSource`] capability, which unifies
//! in-memory CAs, PEM files on disk, and raw PEM bytes behind one signing
//! contract.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use rcgen::{
    CertificateSigningRequestParams, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair,
    KeyUsagePurpose, SerialNumber,
};
use ring::rand::{SecureRandom, SystemRandom};
use rustls::pki_types::{pem::PemObject, CertificateSigningRequestDer};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::prelude::FromDer;

use crate::domain::{Ca, CertificatePem, CsrPem, PrivateKeyPem};
use crate::errors::PkiError;
use crate::utils::certificates::{parse_certificate_info, CertificateInfo};

/// Where a signing CA's key and certificate come from.
///
/// The original interface exposed separate signing entry points for
/// file-based and raw-byte CA material; both are one logical operation
/// over this capability.
pub trait IssuerSource {
    /// The CA private key as PEM.
    fn issuer_key(&self) -> Result<PrivateKeyPem, PkiError>;

    /// The CA certificate as PEM.
    fn issuer_cert(&self) -> Result<CertificatePem, PkiError>;
}

impl IssuerSource for Ca {
    fn issuer_key(&self) -> Result<PrivateKeyPem, PkiError> {
        Ok(self.key.clone())
    }

    fn issuer_cert(&self) -> Result<CertificatePem, PkiError> {
        Ok(self.cert.clone())
    }
}

impl<T: IssuerSource + ?Sized> IssuerSource for &T {
    fn issuer_key(&self) -> Result<PrivateKeyPem, PkiError> {
        (**self).issuer_key()
    }

    fn issuer_cert(&self) -> Result<CertificatePem, PkiError> {
        (**self).issuer_cert()
    }
}

/// CA material held as PEM files on disk.
#[derive(Debug, Clone)]
pub struct CaPaths {
    key_path: PathBuf,
    cert_path: PathBuf,
}

impl CaPaths {
    /// Reference CA material at the given key and certificate paths.
    pub fn new(key_path: impl Into<PathBuf>, cert_path: impl Into<PathBuf>) -> Self {
        Self { key_path: key_path.into(), cert_path: cert_path.into() }
    }
}

impl IssuerSource for CaPaths {
    fn issuer_key(&self) -> Result<PrivateKeyPem, PkiError> {
        let pem = fs::read_to_string(&self.key_path)
            .map_err(|e| PkiError::Io { path: self.key_path.clone(), source: e })?;
        PrivateKeyPem::new(pem)
    }

    fn issuer_cert(&self) -> Result<CertificatePem, PkiError> {
        let pem = fs::read_to_string(&self.cert_path)
            .map_err(|e| PkiError::Io { path: self.cert_path.clone(), source: e })?;
        CertificatePem::new(pem)
    }
}

/// CA material held as raw PEM bytes, e.g. straight out of a secret store.
#[derive(Clone)]
pub struct CaPemBytes {
    key: Vec<u8>,
    cert: Vec<u8>,
}

impl CaPemBytes {
    /// Wrap raw PEM bytes for the CA key and certificate.
    pub fn new(key: Vec<u8>, cert: Vec<u8>) -> Self {
        Self { key, cert }
    }
}

impl IssuerSource for CaPemBytes {
    fn issuer_key(&self) -> Result<PrivateKeyPem, PkiError> {
        let pem = String::from_utf8(self.key.clone())
            .map_err(|_| PkiError::invalid_private_key("key bytes are not UTF-8 PEM"))?;
        PrivateKeyPem::new(pem)
    }

    fn issuer_cert(&self) -> Result<CertificatePem, PkiError> {
        let pem = String::from_utf8(self.cert.clone())
            .map_err(|_| PkiError::invalid_certificate("certificate bytes are not UTF-8 PEM"))?;
        CertificatePem::new(pem)
    }
}

/// Serial number allocator owned by one issuing CA.
///
/// Serials are a random 8-byte prefix drawn at allocator creation followed
/// by a monotonically increasing 8-byte counter: unique within the
/// allocator under any interleaving of concurrent signers, and unique
/// across allocators through the random prefix.
#[derive(Debug)]
pub struct SerialAllocator {
    prefix: [u8; 8],
    counter: AtomicU64,
}

impl SerialAllocator {
    /// Create an allocator with a fresh random prefix.
    pub fn new() -> Result<Self, PkiError> {
        let mut prefix = [0u8; 8];
        SystemRandom::new()
            .fill(&mut prefix)
            .map_err(|_| PkiError::key_generation("randomness unavailable for serial prefix"))?;
        // Clear the top bit so the DER INTEGER stays positive.
        prefix[0] &= 0x7f;
        Ok(Self { prefix, counter: AtomicU64::new(0) })
    }

    /// Allocate the next serial number.
    pub fn next(&self) -> SerialNumber {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&self.prefix);
        bytes.extend_from_slice(&n.to_be_bytes());
        SerialNumber::from(bytes)
    }
}

/// One-off random 16-byte serial for self-signed and CA certificates.
pub(crate) fn random_serial() -> Result<SerialNumber, PkiError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| PkiError::key_generation("randomness unavailable for serial number"))?;
    bytes[0] &= 0x7f;
    Ok(SerialNumber::from(bytes.to_vec()))
}

/// Signs CSRs under one CA's key and certificate.
pub struct CertSigner<S: IssuerSource> {
    issuer: S,
    serials: SerialAllocator,
}

impl<S: IssuerSource> CertSigner<S> {
    /// Create a signer for the given CA material.
    pub fn new(issuer: S) -> Result<Self, PkiError> {
        Ok(Self { issuer, serials: SerialAllocator::new()? })
    }

    /// The CA material this signer issues under.
    pub fn issuer(&self) -> &S {
        &self.issuer
    }

    /// Sign `csr` into an end-entity certificate valid for `validity_days`
    /// from now.
    ///
    /// The CSR's proof-of-possession signature is verified first
    /// ([`PkiError::InvalidCsrSignature`] on failure, before any content of
    /// the request is used), then the issuer certificate's own validity
    /// window ([`PkiError::ExpiredIssuer`]). The subject and SANs are taken
    /// from the request; the issued certificate is never a CA and carries
    /// no path-length constraint.
    pub fn sign(&self, csr: &CsrPem, validity_days: u32) -> Result<CertificatePem, PkiError> {
        verify_csr_signature(csr)?;

        let issuer_cert = self.issuer.issuer_cert()?;
        let issuer_info = parse_certificate_info(&issuer_cert)?;
        ensure_issuer_current(&issuer_info)?;

        let mut request = CertificateSigningRequestParams::from_pem(csr.as_str())
            .map_err(|e| PkiError::invalid_csr(e.to_string()))?;

        let serial = self.serials.next();
        let not_before = OffsetDateTime::now_utc();
        request.params.not_before = not_before;
        request.params.not_after = not_before + Duration::days(i64::from(validity_days));
        request.params.serial_number = Some(serial);
        request.params.is_ca = IsCa::NoCa;
        request.params.key_usages =
            vec![KeyUsagePurpose::DigitalSignature, KeyUsagePurpose::KeyEncipherment];
        request.params.extended_key_usages =
            vec![ExtendedKeyUsagePurpose::ServerAuth, ExtendedKeyUsagePurpose::ClientAuth];
        request.params.use_authority_key_identifier_extension = true;

        let issuer_key = self.issuer.issuer_key()?;
        let key_pair = KeyPair::from_pem(issuer_key.expose())
            .map_err(|e| PkiError::invalid_private_key(e.to_string()))?;
        let issuer = Issuer::from_ca_cert_pem(issuer_cert.as_str(), key_pair)
            .map_err(|e| PkiError::invalid_certificate_with_source("load issuer certificate", e))?;

        let cert = request
            .signed_by(&issuer)
            .map_err(|e| PkiError::signing("sign end-entity certificate", e))?;

        debug!(
            issuer = %issuer_info.subject,
            validity_days,
            "Issued end-entity certificate"
        );
        Ok(CertificatePem::from_generated(cert.pem()))
    }
}

fn verify_csr_signature(csr: &CsrPem) -> Result<(), PkiError> {
    let der = CertificateSigningRequestDer::from_pem_slice(csr.as_str().as_bytes())
        .map_err(|e| PkiError::invalid_csr(format!("not a PEM certificate request: {e}")))?;
    let (_, request) = X509CertificationRequest::from_der(der.as_ref())
        .map_err(|e| PkiError::invalid_csr(e.to_string()))?;

    request.verify_signature().map_err(|_| {
        warn!("Rejected CSR whose self-signature does not verify");
        PkiError::InvalidCsrSignature
    })
}

fn ensure_issuer_current(info: &CertificateInfo) -> Result<(), PkiError> {
    let now = chrono::Utc::now();
    if now < info.not_before || now > info.not_after {
        return Err(PkiError::ExpiredIssuer {
            subject: info.subject.clone(),
            not_before: info.not_before,
            not_after: info.not_after,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::domain::{Subject, ValidityWindow};
    use crate::pki::ca::generate_root_ca;
    use crate::pki::csr::generate_csr;
    use crate::utils::certificates::verify_signed_by;

    fn issuing_ca() -> Ca {
        let subject = Subject::new("signer-test-ca").with_organization("certplane");
        generate_root_ca(&subject, &ValidityWindow::days_from_now(365), 0).unwrap()
    }

    #[test]
    fn test_signed_certificate_verifies_and_carries_subject() {
        let ca = issuing_ca();
        let signer = CertSigner::new(ca.clone()).unwrap();

        let subject = Subject::new("broker-0").with_dns_name("broker-0.cluster.local");
        let (_key, csr) = generate_csr(&subject).unwrap();
        let cert = signer.sign(&csr, 90).unwrap();

        verify_signed_by(&cert, &ca.cert).unwrap();
        let info = parse_certificate_info(&cert).unwrap();
        assert!(info.subject.contains("broker-0"));
        assert!(!info.is_ca);
        assert_eq!(info.path_len_constraint, None);
    }

    #[test]
    fn test_expired_issuer_rejected() {
        let subject = Subject::new("expired-ca");
        let past = OffsetDateTime::now_utc() - Duration::days(730);
        let window = ValidityWindow::new(past, past + Duration::days(365)).unwrap();
        let ca = generate_root_ca(&subject, &window, 0).unwrap();
        let signer = CertSigner::new(ca).unwrap();

        let (_key, csr) = generate_csr(&Subject::new("broker-0")).unwrap();
        let err = signer.sign(&csr, 30).unwrap_err();
        assert!(matches!(err, PkiError::ExpiredIssuer { .. }));
    }

    #[test]
    fn test_garbage_csr_rejected() {
        let signer = CertSigner::new(issuing_ca()).unwrap();
        let csr = CsrPem::new(
            "-----BEGIN CERTIFICATE REQUEST-----\nAAAA\n-----END CERTIFICATE REQUEST-----",
        )
        .unwrap();

        let err = signer.sign(&csr, 30).unwrap_err();
        assert!(matches!(err, PkiError::InvalidCsr { .. }));
    }

    #[test]
    fn test_serial_allocator_unique_and_positive() {
        let allocator = SerialAllocator::new().unwrap();
        let mut seen = HashSet::new();
        for _ in 0..256 {
            let serial = allocator.next();
            assert!(seen.insert(format!("{serial:?}")), "serial repeated");
        }
    }

    #[test]
    fn test_issued_serials_distinct() {
        let signer = CertSigner::new(issuing_ca()).unwrap();
        let mut serials = HashSet::new();
        for i in 0..4 {
            let (_key, csr) = generate_csr(&Subject::new(format!("client-{i}"))).unwrap();
            let cert = signer.sign(&csr, 30).unwrap();
            let info = parse_certificate_info(&cert).unwrap();
            assert!(serials.insert(info.serial), "issued serial repeated");
        }
    }

    #[test]
    fn test_ca_paths_source_roundtrip() {
        let ca = issuing_ca();
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("ca.key");
        let cert_path = dir.path().join("ca.crt");
        crate::utils::fs::atomic_write_secret(&key_path, ca.key.expose().as_bytes()).unwrap();
        crate::utils::fs::atomic_write(&cert_path, ca.cert.as_str().as_bytes()).unwrap();

        let source = CaPaths::new(&key_path, &cert_path);
        let signer = CertSigner::new(source).unwrap();
        let (_key, csr) = generate_csr(&Subject::new("from-disk")).unwrap();
        let cert = signer.sign(&csr, 30).unwrap();
        verify_signed_by(&cert, &ca.cert).unwrap();
    }

    #[test]
    fn test_ca_pem_bytes_source() {
        let ca = issuing_ca();
        let source = CaPemBytes::new(
            ca.key.expose().as_bytes().to_vec(),
            ca.cert.as_str().as_bytes().to_vec(),
        );
        let signer = CertSigner::new(source).unwrap();
        let (_key, csr) = generate_csr(&Subject::new("from-bytes")).unwrap();
        let cert = signer.sign(&csr, 30).unwrap();
        verify_signed_by(&cert, &ca.cert).unwrap();
    }

    #[test]
    fn test_missing_ca_files_surface_io_error() {
        let source = CaPaths::new("/nonexistent/ca.key", "/nonexistent/ca.crt");
        let err = source.issuer_key().unwrap_err();
        assert!(matches!(err, PkiError::Io { .. }));
    }
}
