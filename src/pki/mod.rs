//! Certificate authority and identity lifecycle operations.
//!
//! Data flows leaf-first through this module: [`ca`] produces CA key and
//! certificate material, [`csr`] produces end-entity keypairs and signing
//! requests, [`signer`] turns requests into certificates under a CA, and
//! [`renewal`] drives re-issuance for an existing subject while keeping
//! its key material stable. The [`manager`] module ties the capability set
//! into a single injectable trait.

pub mod ca;
pub mod csr;
pub mod manager;
pub mod renewal;
pub mod signer;

pub use ca::{
    generate_intermediate_ca, generate_root_ca, generate_self_signed_cert, renew_self_signed,
};
pub use csr::{csr_for_key, generate_csr};
pub use manager::{CertManager, DefaultCertManager};
pub use renewal::{RenewalEngine, RenewalState};
pub use signer::{CaPaths, CaPemBytes, CertSigner, IssuerSource, SerialAllocator};
