//! # Key Encryption Key (KEK) Service
//!
//! Derives a single symmetric key from an operator-supplied passphrase at
//! process start and uses it to seal/unseal at-rest secrets: private signing
//! JWKs, and any other server-held secret that must survive a restart
//! without ever touching disk in plaintext.
//!
//! The KEK is deliberately the one place in this codebase that diverges from
//! the rest of the Argon2id usage pattern: every other Argon2id call in this
//! crate hashes a *password* with a freshly generated random salt, because
//! passwords are compared, never re-derived into a reusable key. The KEK
//! must re-derive the *same* key every time the process starts, so its salt
//! is fixed and compiled in rather than random.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

use super::primitives::random_bytes;

/// Fixed salt for KEK derivation. Not a secret — Argon2id's salt only needs
/// to be unique per derivation context, and this process has exactly one.
/// Changing this value invalidates every previously sealed secret.
const KEK_SALT: &[u8] = b"darkauth-kek-v1-fixed-salt-do-not-change";

const KEK_MEMORY_KIB: u32 = 64 * 1024;
const KEK_ITERATIONS: u32 = 3;
const KEK_PARALLELISM: u32 = 1;
const KEK_KEY_LEN: usize = 32;
const GCM_NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum KekError {
    #[error("KEK key derivation failed: {0}")]
    Derivation(String),
    #[error("KEK is not available (no passphrase configured)")]
    Unavailable,
    #[error("seal operation failed")]
    SealFailed,
    #[error("unseal operation failed: ciphertext invalid or key mismatch")]
    UnsealFailed,
    #[error("ciphertext too short to contain a nonce")]
    CiphertextTooShort,
}

/// Holds the derived 32-byte key-encryption key, or nothing if no passphrase
/// was configured (development-only posture; `available()` reports this).
pub struct Kek {
    key: Option<[u8; KEK_KEY_LEN]>,
}

impl Kek {
    /// Derives the KEK from `passphrase` using
    /// `Argon2id(m=64MiB, t=3, p=1, len=32)` over the fixed salt above.
    pub fn derive(passphrase: &str) -> Result<Self, KekError> {
        let params = Params::new(KEK_MEMORY_KIB, KEK_ITERATIONS, KEK_PARALLELISM, Some(KEK_KEY_LEN))
            .map_err(|e| KekError::Derivation(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; KEK_KEY_LEN];
        argon2
            .hash_password_into(passphrase.as_bytes(), KEK_SALT, &mut key)
            .map_err(|e| KekError::Derivation(e.to_string()))?;

        Ok(Self { key: Some(key) })
    }

    /// Builds a KEK with no key material. `available()` reports false and
    /// every seal/unseal call returns `KekError::Unavailable`. Intended only
    /// for development environments where the operator hasn't configured a
    /// passphrase; the signing-key service refuses to start without an
    /// available KEK outside of development.
    pub fn unavailable() -> Self {
        Self { key: None }
    }

    pub fn available(&self) -> bool {
        self.key.is_some()
    }

    /// Encrypts `plaintext` with AES-256-GCM under a fresh random 12-byte
    /// nonce, returning `nonce || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, KekError> {
        let key = self.key.as_ref().ok_or(KekError::Unavailable)?;
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KekError::SealFailed)?;

        let nonce_bytes = random_bytes(GCM_NONCE_LEN);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| KekError::SealFailed)?;

        let mut out = Vec::with_capacity(GCM_NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypts a `nonce || ciphertext || tag` blob produced by [`Self::seal`].
    pub fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, KekError> {
        let key = self.key.as_ref().ok_or(KekError::Unavailable)?;
        if sealed.len() < GCM_NONCE_LEN {
            return Err(KekError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(GCM_NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KekError::UnsealFailed)?;
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| KekError::UnsealFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let a = Kek::derive("correct horse battery staple").unwrap();
        let b = Kek::derive("correct horse battery staple").unwrap();
        assert_eq!(a.key, b.key);
    }

    #[test]
    fn test_different_passphrase_different_key() {
        let a = Kek::derive("passphrase-one").unwrap();
        let b = Kek::derive("passphrase-two").unwrap();
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_seal_unseal_roundtrip() {
        let kek = Kek::derive("test-passphrase").unwrap();
        let plaintext = b"super secret private jwk material";
        let sealed = kek.seal(plaintext).unwrap();
        assert_ne!(sealed.as_slice(), plaintext);
        let unsealed = kek.unseal(&sealed).unwrap();
        assert_eq!(unsealed, plaintext);
    }

    #[test]
    fn test_seal_nonce_is_random_each_call() {
        let kek = Kek::derive("test-passphrase").unwrap();
        let a = kek.seal(b"same plaintext").unwrap();
        let b = kek.seal(b"same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unseal_with_wrong_key_fails() {
        let kek_a = Kek::derive("passphrase-a").unwrap();
        let kek_b = Kek::derive("passphrase-b").unwrap();
        let sealed = kek_a.seal(b"data").unwrap();
        assert!(kek_b.unseal(&sealed).is_err());
    }

    #[test]
    fn test_unavailable_kek_errors() {
        let kek = Kek::unavailable();
        assert!(!kek.available());
        assert!(matches!(kek.seal(b"x"), Err(KekError::Unavailable)));
        assert!(matches!(kek.unseal(b"x"), Err(KekError::Unavailable)));
    }

    #[test]
    fn test_unseal_rejects_short_ciphertext() {
        let kek = Kek::derive("test-passphrase").unwrap();
        assert!(matches!(
            kek.unseal(&[0u8; 4]),
            Err(KekError::CiphertextTooShort)
        ));
    }
}
