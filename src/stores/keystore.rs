//! Keystore assembly: private key plus certificate chain under one alias.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::config::StoreSettings;
use crate::domain::{CertificatePem, PrivateKeyPem};
use crate::errors::StoreError;
use crate::stores::sealed;

#[derive(Serialize, Deserialize)]
struct KeyStoreManifest {
    entries: BTreeMap<String, ManifestEntry>,
}

#[derive(Serialize, Deserialize)]
struct ManifestEntry {
    private_key_pem: String,
    certificate_chain_pem: Vec<String>,
}

/// One keystore entry read back out of a sealed blob.
#[derive(Debug)]
pub struct KeyEntry {
    pub key: PrivateKeyPem,
    pub chain: Vec<CertificatePem>,
}

/// Package `key` and its certificate chain under `alias` into a sealed
/// keystore blob.
///
/// Every invocation produces a wholly new container; keystores are
/// immutable artifacts rebuilt whenever their source material changes.
pub fn build_key_store(
    key: &PrivateKeyPem,
    chain: &[CertificatePem],
    alias: &str,
    password: &str,
    settings: &StoreSettings,
) -> Result<Vec<u8>, StoreError> {
    if chain.is_empty() {
        return Err(StoreError::malformed("certificate chain must not be empty"));
    }

    let mut entries = BTreeMap::new();
    entries.insert(
        alias.to_string(),
        ManifestEntry {
            private_key_pem: key.expose().to_string(),
            certificate_chain_pem: chain.iter().map(|c| c.as_str().to_string()).collect(),
        },
    );
    let manifest = KeyStoreManifest { entries };

    let mut plaintext = serde_json::to_vec(&manifest)
        .map_err(|e| StoreError::encoding("serialize keystore manifest", e))?;
    let blob = sealed::seal(&plaintext, password, settings.pbkdf2_iterations);
    plaintext.zeroize();
    let blob = blob?;

    debug!(alias, chain_len = chain.len(), "Built sealed keystore");
    Ok(blob)
}

/// Open a sealed keystore and return its entries.
///
/// A wrong password fails with [`StoreError::WrongPassword`]; it never
/// yields an empty store.
pub fn read_key_store(
    blob: &[u8],
    password: &str,
) -> Result<BTreeMap<String, KeyEntry>, StoreError> {
    let mut plaintext = sealed::open(blob, password)?;
    let manifest: KeyStoreManifest = match serde_json::from_slice(&plaintext) {
        Ok(manifest) => manifest,
        Err(_) => {
            plaintext.zeroize();
            return Err(StoreError::malformed("keystore manifest failed to decode"));
        }
    };
    plaintext.zeroize();

    let mut entries = BTreeMap::new();
    for (alias, entry) in manifest.entries {
        let key = PrivateKeyPem::new(entry.private_key_pem)
            .map_err(|_| StoreError::malformed("keystore entry holds an invalid private key"))?;
        let chain = entry
            .certificate_chain_pem
            .into_iter()
            .map(|pem| {
                CertificatePem::new(pem)
                    .map_err(|_| StoreError::malformed("keystore entry holds an invalid certificate"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.insert(alias, KeyEntry { key, chain });
    }
    Ok(entries)
}
