//! Shared helpers for the integration suites.

use std::num::NonZeroU32;

use certplane::config::StoreSettings;
use certplane::{DefaultCertManager, Settings, Subject};

/// A manager with the store KDF cost lowered so suites stay fast; the
/// sealing format embeds the cost, so nothing else changes.
pub fn fast_manager() -> DefaultCertManager {
    DefaultCertManager::with_settings(Settings {
        stores: StoreSettings { pbkdf2_iterations: NonZeroU32::new(2048).unwrap() },
        ..Settings::default()
    })
}

pub fn cluster_ca_subject() -> Subject {
    Subject::new("cluster-ca").with_organization("certplane-tests")
}

pub fn broker_subject() -> Subject {
    Subject::new("broker-0")
        .with_organization("certplane-tests")
        .with_dns_name("broker-0.cluster.local")
}
