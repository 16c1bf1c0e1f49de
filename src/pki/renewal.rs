//! Renewal engine: key-preserving re-issuance for an existing subject.
//!
//! The engine is a two-state machine. `Active` means the current
//! certificate is the one in service; `Renewing` means a replacement has
//! been issued but the caller has not yet confirmed it is distributed.
//! Both transitions are driven externally: the reconciliation loop decides
//! when to renew and when distribution is complete; this engine only
//! produces the material and enforces the transition order.

use tracing::info;

use crate::domain::{CertifiedKey, Subject};
use crate::errors::PkiError;
use crate::pki::csr::{csr_for_key, generate_csr};
use crate::pki::signer::{CertSigner, IssuerSource};

/// Lifecycle state of one managed identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalState {
    /// The current certificate is in service.
    Active,
    /// A replacement has been issued and awaits distribution confirmation.
    Renewing,
}

/// Drives certificate re-issuance for one subject under one issuing CA.
pub struct RenewalEngine<S: IssuerSource> {
    signer: CertSigner<S>,
    subject: Subject,
    current: CertifiedKey,
    pending: Option<CertifiedKey>,
    state: RenewalState,
}

impl<S: IssuerSource> RenewalEngine<S> {
    /// Manage `current`, issued for `subject`, renewing through `signer`.
    pub fn new(signer: CertSigner<S>, subject: Subject, current: CertifiedKey) -> Self {
        Self { signer, subject, current, pending: None, state: RenewalState::Active }
    }

    /// The current state.
    pub fn state(&self) -> RenewalState {
        self.state
    }

    /// The identity currently in service.
    pub fn current(&self) -> &CertifiedKey {
        &self.current
    }

    /// The pending identity, if a renewal is in flight.
    pub fn pending(&self) -> Option<&CertifiedKey> {
        self.pending.as_ref()
    }

    /// Issue a replacement certificate for the managed subject.
    ///
    /// By default the existing private key is reused so routine rotation
    /// never requires redistributing key material. With `force_new_key` a
    /// fresh keypair is generated; retiring the old key is the caller's
    /// responsibility. Transitions `Active -> Renewing`.
    pub fn begin_renewal(
        &mut self,
        validity_days: u32,
        force_new_key: bool,
    ) -> Result<&CertifiedKey, PkiError> {
        if self.state != RenewalState::Active {
            return Err(PkiError::renewal_state("a renewal is already in progress"));
        }

        let (key, csr) = if force_new_key {
            generate_csr(&self.subject)?
        } else {
            (self.current.key.clone(), csr_for_key(&self.current.key, &self.subject)?)
        };
        let cert = self.signer.sign(&csr, validity_days)?;

        info!(
            subject = %self.subject,
            force_new_key,
            "Issued renewal certificate; awaiting distribution confirmation"
        );
        self.state = RenewalState::Renewing;
        Ok(&*self.pending.insert(CertifiedKey { key, cert }))
    }

    /// Confirm the pending certificate has been distributed; it becomes the
    /// current identity. Transitions `Renewing -> Active`.
    pub fn confirm_distribution(&mut self) -> Result<&CertifiedKey, PkiError> {
        match self.pending.take() {
            Some(pending) if self.state == RenewalState::Renewing => {
                self.current = pending;
                self.state = RenewalState::Active;
                info!(subject = %self.subject, "Renewal confirmed; replacement is now current");
                Ok(&self.current)
            }
            _ => Err(PkiError::renewal_state("no renewal awaiting confirmation")),
        }
    }

    /// Drop the pending certificate and return to `Active` with the
    /// previous identity untouched.
    pub fn abort_renewal(&mut self) -> Result<(), PkiError> {
        if self.state != RenewalState::Renewing {
            return Err(PkiError::renewal_state("no renewal in progress to abort"));
        }
        self.pending = None;
        self.state = RenewalState::Active;
        info!(subject = %self.subject, "Renewal aborted; previous identity remains current");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Subject, ValidityWindow};
    use crate::pki::ca::generate_root_ca;
    use crate::pki::csr::generate_csr;
    use crate::utils::certificates::public_key_bits;

    fn engine() -> RenewalEngine<crate::domain::Ca> {
        let ca_subject = Subject::new("renewal-test-ca").with_organization("certplane");
        let ca = generate_root_ca(&ca_subject, &ValidityWindow::days_from_now(365), 0).unwrap();
        let signer = CertSigner::new(ca).unwrap();

        let subject = Subject::new("broker-0").with_dns_name("broker-0.cluster.local");
        let (key, csr) = generate_csr(&subject).unwrap();
        let cert = signer.sign(&csr, 90).unwrap();

        RenewalEngine::new(signer, subject, CertifiedKey { key, cert })
    }

    #[test]
    fn test_renewal_reuses_key_by_default() {
        let mut engine = engine();
        let before = public_key_bits(&engine.current().cert).unwrap();

        engine.begin_renewal(90, false).unwrap();
        assert_eq!(engine.state(), RenewalState::Renewing);

        let renewed = engine.confirm_distribution().unwrap();
        assert_eq!(public_key_bits(&renewed.cert).unwrap(), before);
        assert_eq!(engine.state(), RenewalState::Active);
    }

    #[test]
    fn test_force_new_key_rotates_key() {
        let mut engine = engine();
        let before = public_key_bits(&engine.current().cert).unwrap();

        engine.begin_renewal(90, true).unwrap();
        let renewed = engine.confirm_distribution().unwrap();
        assert_ne!(public_key_bits(&renewed.cert).unwrap(), before);
    }

    #[test]
    fn test_double_begin_rejected() {
        let mut engine = engine();
        engine.begin_renewal(90, false).unwrap();

        let err = engine.begin_renewal(90, false).unwrap_err();
        assert!(matches!(err, PkiError::RenewalState { .. }));
    }

    #[test]
    fn test_confirm_without_begin_rejected() {
        let mut engine = engine();
        let err = engine.confirm_distribution().unwrap_err();
        assert!(matches!(err, PkiError::RenewalState { .. }));
    }

    #[test]
    fn test_abort_restores_previous_identity() {
        let mut engine = engine();
        let before = engine.current().cert.clone();

        engine.begin_renewal(90, false).unwrap();
        engine.abort_renewal().unwrap();

        assert_eq!(engine.state(), RenewalState::Active);
        assert!(engine.pending().is_none());
        assert_eq!(engine.current().cert, before);

        let err = engine.abort_renewal().unwrap_err();
        assert!(matches!(err, PkiError::RenewalState { .. }));
    }
}
