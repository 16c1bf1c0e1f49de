//! # Configuration Management
//!
//! Minimal settings for the lifecycle operations: issuance defaults for
//! the PKI paths and the key-derivation cost for sealed stores. Values
//! come from `Default` or from `CERTPLANE_*` environment variables.

use std::num::NonZeroU32;

use crate::errors::ConfigError;

const DEFAULT_CA_VALIDITY_DAYS: u32 = 3650;
const DEFAULT_RENEWAL_WINDOW_DAYS: u32 = 30;

// OWASP-recommended cost for PBKDF2-HMAC-SHA256.
const DEFAULT_KDF_ITERATIONS: NonZeroU32 = match NonZeroU32::new(600_000) {
    Some(v) => v,
    None => panic!("default KDF iteration count must be non-zero"),
};

/// Library settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub pki: PkiSettings,
    pub stores: StoreSettings,
}

/// Issuance and renewal defaults.
#[derive(Debug, Clone)]
pub struct PkiSettings {
    /// Default validity for generated CA certificates, in days.
    pub default_ca_validity_days: u32,
    /// How long before expiry a certificate counts as due for renewal.
    pub renewal_window_days: u32,
}

impl Default for PkiSettings {
    fn default() -> Self {
        Self {
            default_ca_validity_days: DEFAULT_CA_VALIDITY_DAYS,
            renewal_window_days: DEFAULT_RENEWAL_WINDOW_DAYS,
        }
    }
}

/// Sealed store settings.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// PBKDF2-HMAC-SHA256 iteration count for deriving store keys.
    pub pbkdf2_iterations: NonZeroU32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { pbkdf2_iterations: DEFAULT_KDF_ITERATIONS }
    }
}

impl Settings {
    /// Create settings from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_ca_validity_days =
            env_u32("CERTPLANE_CA_VALIDITY_DAYS", DEFAULT_CA_VALIDITY_DAYS)?;
        let renewal_window_days =
            env_u32("CERTPLANE_RENEWAL_WINDOW_DAYS", DEFAULT_RENEWAL_WINDOW_DAYS)?;

        let pbkdf2_iterations = match std::env::var("CERTPLANE_STORE_KDF_ITERATIONS") {
            Ok(value) => {
                let parsed: u32 = value.parse().map_err(|_| {
                    ConfigError::invalid_value("CERTPLANE_STORE_KDF_ITERATIONS", "not a number")
                })?;
                NonZeroU32::new(parsed).ok_or_else(|| {
                    ConfigError::invalid_value("CERTPLANE_STORE_KDF_ITERATIONS", "must be non-zero")
                })?
            }
            Err(_) => DEFAULT_KDF_ITERATIONS,
        };

        Ok(Self {
            pki: PkiSettings { default_ca_validity_days, renewal_window_days },
            stores: StoreSettings { pbkdf2_iterations },
        })
    }
}

fn env_u32(var: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.parse().map_err(|_| ConfigError::invalid_value(var, "not a number")),
        Err(_) => Ok(default),
    }
}
