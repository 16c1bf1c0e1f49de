//! Certificate management capability trait.
//!
//! The full lifecycle surface (self-signed issuance and renewal,
//! root/intermediate CA generation, CSR production, CSR signing, store
//! assembly) hangs off one trait so consumers can inject the
//! implementation: the rcgen/ring-backed [`DefaultCertManager`] in
//! production, a deterministic double in tests.

use tracing::instrument;

use crate::config::Settings;
use crate::domain::{
    Ca, CertificatePem, CertifiedKey, CsrPem, PrivateKeyPem, Subject, ValidityWindow,
};
use crate::errors::{PkiError, StoreError};
use crate::pki::signer::{CertSigner, IssuerSource};
use crate::pki::{ca, csr};
use crate::stores;
use crate::utils::certificates::{parse_certificate_info, within_renewal_window};

/// Certificate authority and identity lifecycle operations.
///
/// All operations are synchronous pure functions over explicit inputs:
/// no shared mutable state, safe to call from concurrent reconciliation
/// workers operating on distinct subjects and aliases.
pub trait CertManager {
    /// Generate a standalone self-signed identity valid for `days` days.
    fn generate_self_signed_cert(
        &self,
        subject: &Subject,
        days: u32,
    ) -> Result<CertifiedKey, PkiError>;

    /// Re-issue a self-signed certificate over an existing private key,
    /// preserving the public identity.
    fn renew_self_signed_cert(
        &self,
        key: &PrivateKeyPem,
        subject: &Subject,
        days: u32,
    ) -> Result<CertificatePem, PkiError>;

    /// Generate a self-signed root CA with an explicit validity window and
    /// path-length budget.
    fn generate_root_ca(
        &self,
        subject: &Subject,
        window: &ValidityWindow,
        path_length: u8,
    ) -> Result<Ca, PkiError>;

    /// Generate an intermediate CA signed by `parent`.
    fn generate_intermediate_ca(
        &self,
        parent: &Ca,
        subject: &Subject,
        window: &ValidityWindow,
        path_length: u8,
    ) -> Result<Ca, PkiError>;

    /// Generate an end-entity keypair and signing request for `subject`.
    fn generate_csr(&self, subject: &Subject) -> Result<(PrivateKeyPem, CsrPem), PkiError>;

    /// Sign a CSR under the given CA material, valid for `validity_days`
    /// from now.
    fn sign_certificate(
        &self,
        csr: &CsrPem,
        issuer: &dyn IssuerSource,
        validity_days: u32,
    ) -> Result<CertificatePem, PkiError>;

    /// Package a key and its certificate chain into a sealed keystore.
    fn build_key_store(
        &self,
        key: &PrivateKeyPem,
        chain: &[CertificatePem],
        alias: &str,
        password: &str,
    ) -> Result<Vec<u8>, StoreError>;

    /// Insert (or overwrite) a trusted certificate in a sealed trust
    /// store, returning the new store.
    fn add_trusted_cert(
        &self,
        cert: &CertificatePem,
        alias: &str,
        store: &[u8],
        password: &str,
        overwrite: bool,
    ) -> Result<Vec<u8>, StoreError>;

    /// Remove the named aliases from a sealed trust store, returning the
    /// new store. Absent aliases are a no-op.
    fn delete_from_trust_store(
        &self,
        aliases: &[String],
        store: &[u8],
        password: &str,
    ) -> Result<Vec<u8>, StoreError>;
}

/// The rcgen/ring-backed [`CertManager`] implementation.
#[derive(Debug, Clone, Default)]
pub struct DefaultCertManager {
    settings: Settings,
}

impl DefaultCertManager {
    /// Create a manager with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager with explicit settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self { settings }
    }

    /// The active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// A validity window covering the configured default CA lifetime,
    /// starting now.
    pub fn default_ca_window(&self) -> ValidityWindow {
        ValidityWindow::days_from_now(self.settings.pki.default_ca_validity_days)
    }

    /// Whether `cert` is inside the configured renewal window (expired or
    /// expiring soon). The decision to rotate stays with the caller.
    pub fn needs_renewal(&self, cert: &CertificatePem) -> Result<bool, PkiError> {
        let info = parse_certificate_info(cert)?;
        Ok(within_renewal_window(&info, self.settings.pki.renewal_window_days))
    }
}

impl CertManager for DefaultCertManager {
    #[instrument(skip(self))]
    fn generate_self_signed_cert(
        &self,
        subject: &Subject,
        days: u32,
    ) -> Result<CertifiedKey, PkiError> {
        ca::generate_self_signed_cert(subject, days)
    }

    #[instrument(skip(self, key))]
    fn renew_self_signed_cert(
        &self,
        key: &PrivateKeyPem,
        subject: &Subject,
        days: u32,
    ) -> Result<CertificatePem, PkiError> {
        ca::renew_self_signed(key, subject, &ValidityWindow::days_from_now(days), 0)
    }

    #[instrument(skip(self))]
    fn generate_root_ca(
        &self,
        subject: &Subject,
        window: &ValidityWindow,
        path_length: u8,
    ) -> Result<Ca, PkiError> {
        ca::generate_root_ca(subject, window, path_length)
    }

    #[instrument(skip(self, parent))]
    fn generate_intermediate_ca(
        &self,
        parent: &Ca,
        subject: &Subject,
        window: &ValidityWindow,
        path_length: u8,
    ) -> Result<Ca, PkiError> {
        ca::generate_intermediate_ca(parent, subject, window, path_length)
    }

    #[instrument(skip(self))]
    fn generate_csr(&self, subject: &Subject) -> Result<(PrivateKeyPem, CsrPem), PkiError> {
        csr::generate_csr(subject)
    }

    #[instrument(skip(self, csr, issuer))]
    fn sign_certificate(
        &self,
        csr: &CsrPem,
        issuer: &dyn IssuerSource,
        validity_days: u32,
    ) -> Result<CertificatePem, PkiError> {
        CertSigner::new(issuer)?.sign(csr, validity_days)
    }

    #[instrument(skip(self, key, chain, password))]
    fn build_key_store(
        &self,
        key: &PrivateKeyPem,
        chain: &[CertificatePem],
        alias: &str,
        password: &str,
    ) -> Result<Vec<u8>, StoreError> {
        stores::build_key_store(key, chain, alias, password, &self.settings.stores)
    }

    #[instrument(skip(self, cert, store, password))]
    fn add_trusted_cert(
        &self,
        cert: &CertificatePem,
        alias: &str,
        store: &[u8],
        password: &str,
        overwrite: bool,
    ) -> Result<Vec<u8>, StoreError> {
        stores::add_trusted_cert(cert, alias, store, password, overwrite, &self.settings.stores)
    }

    #[instrument(skip(self, store, password))]
    fn delete_from_trust_store(
        &self,
        aliases: &[String],
        store: &[u8],
        password: &str,
    ) -> Result<Vec<u8>, StoreError> {
        stores::delete_from_trust_store(aliases, store, password, &self.settings.stores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    use crate::config::StoreSettings;
    use crate::utils::certificates::verify_signed_by;

    fn manager() -> DefaultCertManager {
        DefaultCertManager::with_settings(Settings {
            stores: StoreSettings { pbkdf2_iterations: NonZeroU32::new(1024).unwrap() },
            ..Settings::default()
        })
    }

    #[test]
    fn test_trait_object_signing_flow() {
        let manager = manager();
        let root = manager
            .generate_root_ca(
                &Subject::new("trait-ca"),
                &ValidityWindow::days_from_now(365),
                0,
            )
            .unwrap();

        let (_key, csr) = manager.generate_csr(&Subject::new("worker")).unwrap();
        let cert = manager.sign_certificate(&csr, &root, 30).unwrap();
        verify_signed_by(&cert, &root.cert).unwrap();
    }

    #[test]
    fn test_self_signed_generate_and_renew() {
        let manager = manager();
        let subject = Subject::new("standalone");
        let identity = manager.generate_self_signed_cert(&subject, 30).unwrap();

        let renewed = manager.renew_self_signed_cert(&identity.key, &subject, 365).unwrap();
        verify_signed_by(&renewed, &renewed).unwrap();
    }

    #[test]
    fn test_needs_renewal_tracks_window() {
        let manager = manager();
        let subject = Subject::new("short-lived");

        let soon = manager.generate_self_signed_cert(&subject, 7).unwrap();
        assert!(manager.needs_renewal(&soon.cert).unwrap());

        let long = manager.generate_self_signed_cert(&subject, 3650).unwrap();
        assert!(!manager.needs_renewal(&long.cert).unwrap());
    }

    #[test]
    fn test_store_operations_via_trait() {
        let manager = manager();
        let identity = manager.generate_self_signed_cert(&Subject::new("svc"), 30).unwrap();

        let keystore = manager
            .build_key_store(&identity.key, &[identity.cert.clone()], "svc", "pw")
            .unwrap();
        assert!(!keystore.is_empty());

        let trust = manager.add_trusted_cert(&identity.cert, "svc-ca", &[], "pw", true).unwrap();
        let trust =
            manager.delete_from_trust_store(&["svc-ca".to_string()], &trust, "pw").unwrap();
        let entries = crate::stores::read_trust_store(&trust, "pw").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_default_ca_window_uses_settings() {
        let manager = manager();
        let window = manager.default_ca_window();
        let days = (window.not_after() - window.not_before()).whole_days();
        assert_eq!(days, i64::from(manager.settings().pki.default_ca_validity_days));
    }
}
