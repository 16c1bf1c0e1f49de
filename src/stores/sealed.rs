//! Password-sealed container envelope.
//!
//! Layout: `CPS1` magic, format version, PBKDF2 iteration count, salt,
//! nonce, then AES-256-GCM ciphertext (tag appended). The iteration count
//! travels in the header so blobs sealed under different settings stay
//! readable. A wrong password and a tampered blob are indistinguishable:
//! both fail AEAD authentication.

use std::num::NonZeroU32;

use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

use crate::errors::StoreError;

const MAGIC: &[u8; 4] = b"CPS1";
const VERSION: u8 = 1;

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const KEY_SIZE: usize = 32;
const HEADER_SIZE: usize = MAGIC.len() + 1 + 4 + SALT_SIZE + NONCE_SIZE;

/// Single-use nonce sequence for AES-GCM.
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: NonZeroU32) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations, salt, password.as_bytes(), &mut key);
    key
}

/// Seal `plaintext` under `password` into a self-describing blob.
pub(crate) fn seal(
    plaintext: &[u8],
    password: &str,
    iterations: NonZeroU32,
) -> Result<Vec<u8>, StoreError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_SIZE];
    rng.fill(&mut salt).map_err(|_| StoreError::Randomness)?;
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rng.fill(&mut nonce_bytes).map_err(|_| StoreError::Randomness)?;

    let mut key = derive_key(password, &salt, iterations);
    let unbound_key = UnboundKey::new(&AES_256_GCM, &key).map_err(|_| StoreError::Sealing)?;
    key.zeroize();

    let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));
    let mut ciphertext = plaintext.to_vec();
    ciphertext.reserve(TAG_SIZE);
    sealing_key
        .seal_in_place_append_tag(Aad::empty(), &mut ciphertext)
        .map_err(|_| StoreError::Sealing)?;

    let mut blob = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    blob.extend_from_slice(MAGIC);
    blob.push(VERSION);
    blob.extend_from_slice(&iterations.get().to_be_bytes());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open a sealed blob, authenticating it against `password`.
pub(crate) fn open(blob: &[u8], password: &str) -> Result<Vec<u8>, StoreError> {
    if blob.len() < HEADER_SIZE + TAG_SIZE {
        return Err(StoreError::malformed("container shorter than header and tag"));
    }
    if &blob[..MAGIC.len()] != MAGIC {
        return Err(StoreError::malformed("missing container magic"));
    }
    let version = blob[MAGIC.len()];
    if version != VERSION {
        return Err(StoreError::malformed(format!("unsupported container version {version}")));
    }

    let mut offset = MAGIC.len() + 1;
    let mut iter_bytes = [0u8; 4];
    iter_bytes.copy_from_slice(&blob[offset..offset + 4]);
    offset += 4;
    let iterations = NonZeroU32::new(u32::from_be_bytes(iter_bytes))
        .ok_or_else(|| StoreError::malformed("zero KDF iteration count"))?;

    let salt = &blob[offset..offset + SALT_SIZE];
    offset += SALT_SIZE;
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&blob[offset..offset + NONCE_SIZE]);
    offset += NONCE_SIZE;

    let mut key = derive_key(password, salt, iterations);
    let unbound_key = UnboundKey::new(&AES_256_GCM, &key).map_err(|_| StoreError::Sealing)?;
    key.zeroize();

    let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));
    let mut buffer = blob[offset..].to_vec();
    let plaintext =
        opening_key.open_in_place(Aad::empty(), &mut buffer).map_err(|_| StoreError::WrongPassword)?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iterations() -> NonZeroU32 {
        NonZeroU32::new(1024).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let blob = seal(b"store manifest", "changeit", iterations()).unwrap();
        assert!(blob.len() > HEADER_SIZE + TAG_SIZE);

        let plaintext = open(&blob, "changeit").unwrap();
        assert_eq!(plaintext, b"store manifest");
    }

    #[test]
    fn test_wrong_password_fails() {
        let blob = seal(b"store manifest", "changeit", iterations()).unwrap();
        let err = open(&blob, "wrong").unwrap_err();
        assert!(matches!(err, StoreError::WrongPassword));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut blob = seal(b"store manifest", "changeit", iterations()).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;

        let err = open(&blob, "changeit").unwrap_err();
        assert!(matches!(err, StoreError::WrongPassword));
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let err = open(b"CPS1", "changeit").unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut blob = seal(b"x", "pw", iterations()).unwrap();
        blob[0] = b'X';
        let err = open(&blob, "pw").unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn test_two_seals_differ() {
        let one = seal(b"same", "pw", iterations()).unwrap();
        let two = seal(b"same", "pw", iterations()).unwrap();
        // Fresh salt and nonce per seal.
        assert_ne!(one, two);
    }

    #[test]
    fn test_iteration_count_travels_in_header() {
        let blob = seal(b"data", "pw", NonZeroU32::new(2048).unwrap()).unwrap();
        // Reader does not need to know the sealing settings.
        let plaintext = open(&blob, "pw").unwrap();
        assert_eq!(plaintext, b"data");
    }
}
