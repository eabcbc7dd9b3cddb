// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password envelopes: AES-256-GCM over an arbitrary byte buffer, keyed by
// the SHA-256 digest of the password. The wire format is
//
//     IV (12 bytes) || ciphertext || GCM tag (16 bytes)
//
// and is distributed with the `.aes256` extension. The key derivation is
// unsalted so that envelopes stay interchangeable with the browser build,
// which derives keys the same way.

use std::sync::atomic::{AtomicU64, Ordering};

use folio_core::error::{FolioError, Result};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

/// Length of the random IV prefix.
pub const IV_LEN: usize = NONCE_LEN;

/// Length of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// File extension of sealed envelopes (without the dot).
pub const ENVELOPE_EXTENSION: &str = "aes256";

/// Source of per-envelope IVs.
///
/// Production code uses [`SystemNonceSource`]; tests inject a deterministic
/// source so that envelopes are reproducible.
pub trait NonceSource: Send + Sync {
    fn fill_nonce(&self, nonce: &mut [u8; IV_LEN]) -> Result<()>;
}

/// IVs drawn from the operating system's CSPRNG.
#[derive(Debug)]
pub struct SystemNonceSource {
    rng: SystemRandom,
}

impl SystemNonceSource {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemNonceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceSource for SystemNonceSource {
    fn fill_nonce(&self, nonce: &mut [u8; IV_LEN]) -> Result<()> {
        self.rng
            .fill(nonce)
            .map_err(|_| FolioError::Encryption("system random source unavailable".into()))
    }
}

/// Counter-based IVs seeded with a fixed value. Never reuses an IV within one
/// instance, but is predictable: for tests and reproducible fixtures only.
#[derive(Debug)]
pub struct SeededNonceSource {
    counter: AtomicU64,
}

impl SeededNonceSource {
    pub fn new(seed: u64) -> Self {
        Self {
            counter: AtomicU64::new(seed),
        }
    }
}

impl NonceSource for SeededNonceSource {
    fn fill_nonce(&self, nonce: &mut [u8; IV_LEN]) -> Result<()> {
        let value = self.counter.fetch_add(1, Ordering::Relaxed);
        nonce.fill(0);
        nonce[IV_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

/// A sealed buffer split into its IV and authenticated ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Ciphertext with the GCM tag appended.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Serialise as `IV || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split a serialised envelope. Anything too short to hold an IV and a
    /// tag cannot authenticate and is reported as such.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < IV_LEN + TAG_LEN {
            return Err(FolioError::Authentication);
        }
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[..IV_LEN]);
        Ok(Self {
            iv,
            ciphertext: bytes[IV_LEN..].to_vec(),
        })
    }
}

/// Derive the 256-bit key for `password`.
fn derive_key(password: &str) -> Result<LessSafeKey> {
    let digest = Sha256::digest(password.as_bytes());
    let unbound = UnboundKey::new(&AES_256_GCM, digest.as_slice())
        .map_err(|_| FolioError::Encryption("key derivation produced an invalid key".into()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `password` with a fresh IV from `nonces`.
#[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
pub fn encrypt_bytes(
    plaintext: &[u8],
    password: &str,
    nonces: &dyn NonceSource,
) -> Result<Envelope> {
    let key = derive_key(password)?;
    let mut iv = [0u8; IV_LEN];
    nonces.fill_nonce(&mut iv)?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
        .map_err(|_| FolioError::Encryption("AES-GCM seal failed".into()))?;

    debug!(ciphertext_len = in_out.len(), "encryption complete");
    Ok(Envelope {
        iv,
        ciphertext: in_out,
    })
}

/// Decrypt and authenticate. A wrong password or any tampering yields
/// [`FolioError::Authentication`]; unauthenticated bytes are never returned.
#[instrument(skip_all, fields(ciphertext_len = envelope.ciphertext.len()))]
pub fn decrypt_bytes(envelope: &Envelope, password: &str) -> Result<Vec<u8>> {
    let key = derive_key(password)?;
    let mut in_out = envelope.ciphertext.clone();
    let plaintext_len = key
        .open_in_place(
            Nonce::assume_unique_for_key(envelope.iv),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| FolioError::Authentication)?
        .len();
    in_out.truncate(plaintext_len);

    debug!(plaintext_len, "decryption complete");
    Ok(in_out)
}

/// Encrypt and serialise in one step.
pub fn seal(plaintext: &[u8], password: &str, nonces: &dyn NonceSource) -> Result<Vec<u8>> {
    Ok(encrypt_bytes(plaintext, password, nonces)?.to_bytes())
}

/// Parse and decrypt a serialised envelope in one step.
pub fn open(sealed: &[u8], password: &str) -> Result<Vec<u8>> {
    decrypt_bytes(&Envelope::from_bytes(sealed)?, password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let nonces = SystemNonceSource::new();
        let plaintext = b"%PDF-1.7 folio test document";

        let sealed = seal(plaintext, "CorrectHorse1", &nonces).expect("seal failed");
        assert_eq!(sealed.len(), IV_LEN + plaintext.len() + TAG_LEN);
        assert_ne!(&sealed[IV_LEN..IV_LEN + plaintext.len()], &plaintext[..]);

        let opened = open(&sealed, "CorrectHorse1").expect("open failed");
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn wrong_password_fails_authentication() {
        let nonces = SystemNonceSource::default();
        let sealed = seal(b"secret", "password-alpha", &nonces).expect("seal failed");
        let result = open(&sealed, "password-beta");
        assert!(matches!(result, Err(FolioError::Authentication)));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let nonces = SeededNonceSource::new(7);
        let mut sealed = seal(b"secret payload", "pw", &nonces).expect("seal failed");
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(open(&sealed, "pw"), Err(FolioError::Authentication)));
    }

    #[test]
    fn truncated_envelope_is_authentication_error() {
        assert!(matches!(
            open(&[0u8; IV_LEN + TAG_LEN - 1], "pw"),
            Err(FolioError::Authentication)
        ));
    }

    #[test]
    fn empty_plaintext() {
        let nonces = SeededNonceSource::new(0);
        let sealed = seal(b"", "empty-test", &nonces).expect("seal failed");
        assert_eq!(sealed.len(), IV_LEN + TAG_LEN);
        assert!(open(&sealed, "empty-test").expect("open failed").is_empty());
    }

    #[test]
    fn seeded_source_is_deterministic_and_unique() {
        let a = SeededNonceSource::new(42);
        let b = SeededNonceSource::new(42);
        let first = seal(b"same", "pw", &a).unwrap();
        assert_eq!(first, seal(b"same", "pw", &b).unwrap());
        let second = seal(b"same", "pw", &a).unwrap();
        assert_ne!(first[..IV_LEN], second[..IV_LEN]);
    }

    #[test]
    fn envelope_accessors_split_iv() {
        let nonces = SeededNonceSource::new(1);
        let envelope = encrypt_bytes(b"abc", "pw", &nonces).unwrap();
        let parsed = Envelope::from_bytes(&envelope.to_bytes()).unwrap();
        assert_eq!(parsed.iv(), envelope.iv());
        assert_eq!(parsed.ciphertext(), envelope.ciphertext());
        assert_eq!(decrypt_bytes(&parsed, "pw").unwrap(), b"abc");
    }
}
