//! Password-sealed key and trust store assembly.
//!
//! Stores are derived artifacts: a single opaque binary blob plus a
//! password, rebuilt whole whenever their source key/cert material
//! changes and never edited in place by callers. The sealing envelope is
//! PBKDF2-HMAC-SHA256 key derivation feeding AES-256-GCM; see [`sealed`].

mod sealed;

pub mod keystore;
pub mod truststore;

pub use keystore::{build_key_store, read_key_store, KeyEntry};
pub use truststore::{add_trusted_cert, delete_from_trust_store, read_trust_store};
