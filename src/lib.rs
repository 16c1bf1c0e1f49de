//! # certplane
//!
//! Certificate authority and TLS identity lifecycle toolkit for
//! inter-component cluster communication: generate root and intermediate
//! CAs, issue and renew end-entity certificates through CSR signing, and
//! package the results into password-sealed key and trust stores.
//!
//! ## Architecture
//!
//! The crate is a library consumed by an external reconciliation layer
//! that decides *when* to issue and rotate, and by a secret-persistence
//! layer that stores the resulting bytes:
//!
//! ```text
//! CA Issuer → (CA key, CA cert) → Cert Signer ← CSR Engine
//!                   ↓                  ↓
//!             Renewal Engine     Store Assembler
//! ```
//!
//! All operations are synchronous pure functions over explicit inputs;
//! the only synchronization point is per-CA serial allocation inside
//! [`CertSigner`]. Keys and certificates travel as PEM text; stores are
//! opaque sealed blobs plus a password.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use certplane::{
//!     CertManager, CertSigner, DefaultCertManager, Subject, ValidityWindow,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = DefaultCertManager::new();
//!
//!     // Root and intermediate CA.
//!     let root = manager.generate_root_ca(
//!         &Subject::new("cluster-ca").with_organization("example"),
//!         &ValidityWindow::days_from_now(3650),
//!         1,
//!     )?;
//!     let issuing = manager.generate_intermediate_ca(
//!         &root,
//!         &Subject::new("issuing-ca").with_organization("example"),
//!         &ValidityWindow::days_from_now(1825),
//!         0,
//!     )?;
//!
//!     // End-entity identity, signed under the intermediate.
//!     let broker = Subject::new("broker-0").with_dns_name("broker-0.cluster.local");
//!     let (key, csr) = manager.generate_csr(&broker)?;
//!     let signer = CertSigner::new(issuing.clone())?;
//!     let cert = signer.sign(&csr, 90)?;
//!
//!     // Sealed artifacts for the TLS layer.
//!     let keystore = manager.build_key_store(
//!         &key,
//!         &[cert, issuing.cert.clone(), root.cert.clone()],
//!         "broker-0",
//!         "changeit",
//!     )?;
//!     let truststore =
//!         manager.add_trusted_cert(&root.cert, "cluster-ca", &[], "changeit", true)?;
//!     let _ = (keystore, truststore);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod pki;
pub mod stores;
pub mod utils;

// Re-export commonly used types and traits
pub use config::Settings;
pub use domain::{Ca, CertificatePem, CertifiedKey, CsrPem, PrivateKeyPem, Subject, ValidityWindow};
pub use errors::{ConfigError, PkiError, StoreError};
pub use observability::init_tracing;
pub use pki::{
    CaPaths, CaPemBytes, CertManager, CertSigner, DefaultCertManager, IssuerSource, RenewalEngine,
    RenewalState, SerialAllocator,
};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
