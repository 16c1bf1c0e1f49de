//! Trust store assembly: trusted CA certificates under caller-chosen
//! aliases.
//!
//! Inserts overwrite by default since CA rotation republishes under the
//! same alias; deletion of absent aliases is a no-op so retirement can be
//! retried safely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StoreSettings;
use crate::domain::CertificatePem;
use crate::errors::StoreError;
use crate::stores::sealed;

#[derive(Default, Serialize, Deserialize)]
struct TrustStoreManifest {
    entries: BTreeMap<String, String>,
}

/// Insert `cert` under `alias`, returning a freshly sealed trust store.
///
/// An empty `store` starts a new container. With `overwrite` unset an
/// existing alias fails with [`StoreError::DuplicateAlias`]; the default
/// call path overwrites, since CA rotation reuses the alias.
pub fn add_trusted_cert(
    cert: &CertificatePem,
    alias: &str,
    store: &[u8],
    password: &str,
    overwrite: bool,
    settings: &StoreSettings,
) -> Result<Vec<u8>, StoreError> {
    let mut manifest = open_manifest(store, password)?;

    if !overwrite && manifest.entries.contains_key(alias) {
        return Err(StoreError::duplicate_alias(alias));
    }
    let replaced = manifest.entries.insert(alias.to_string(), cert.as_str().to_string());

    debug!(alias, replaced = replaced.is_some(), "Added trusted certificate");
    seal_manifest(&manifest, password, settings)
}

/// Remove exactly the named aliases, returning a freshly sealed store.
///
/// Absent aliases are skipped, not an error; all other entries are left
/// untouched. Deleting the same aliases twice yields a store with the same
/// contents as deleting them once.
pub fn delete_from_trust_store(
    aliases: &[String],
    store: &[u8],
    password: &str,
    settings: &StoreSettings,
) -> Result<Vec<u8>, StoreError> {
    let mut manifest = open_manifest(store, password)?;

    let mut removed = 0usize;
    for alias in aliases {
        if manifest.entries.remove(alias).is_some() {
            removed += 1;
        }
    }

    debug!(requested = aliases.len(), removed, "Deleted aliases from trust store");
    seal_manifest(&manifest, password, settings)
}

/// Open a sealed trust store and return alias -> certificate.
pub fn read_trust_store(
    blob: &[u8],
    password: &str,
) -> Result<BTreeMap<String, CertificatePem>, StoreError> {
    let manifest = open_manifest(blob, password)?;
    manifest
        .entries
        .into_iter()
        .map(|(alias, pem)| {
            CertificatePem::new(pem)
                .map(|cert| (alias, cert))
                .map_err(|_| StoreError::malformed("trust store entry holds an invalid certificate"))
        })
        .collect()
}

fn open_manifest(store: &[u8], password: &str) -> Result<TrustStoreManifest, StoreError> {
    if store.is_empty() {
        return Ok(TrustStoreManifest::default());
    }
    let plaintext = sealed::open(store, password)?;
    serde_json::from_slice(&plaintext)
        .map_err(|_| StoreError::malformed("trust store manifest failed to decode"))
}

fn seal_manifest(
    manifest: &TrustStoreManifest,
    password: &str,
    settings: &StoreSettings,
) -> Result<Vec<u8>, StoreError> {
    let plaintext = serde_json::to_vec(manifest)
        .map_err(|e| StoreError::encoding("serialize trust store manifest", e))?;
    sealed::seal(&plaintext, password, settings.pbkdf2_iterations)
}
