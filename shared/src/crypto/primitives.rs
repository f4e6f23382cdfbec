//! # Pure Cryptographic Primitives
//!
//! Stateless helpers shared by every crypto-adjacent service in this crate:
//! base64url encode/decode, constant-time comparison, SHA-256, and random
//! byte generation. Keeping these as free functions (rather than methods on
//! a service struct) means the higher-level services — KEK, JWE, JWKS, TOTP —
//! can all depend on the same vetted primitives without depending on each
//! other.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Encodes bytes as unpadded base64url, the wire format used throughout the
/// OIDC/OPAQUE surface (JWT segments, opaque session tokens, wrapped DRK
/// blobs).
pub fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes unpadded base64url back to bytes.
pub fn b64url_decode(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(value)
}

/// Computes SHA-256 over `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes SHA-256 over `data`, base64url-encoded. Used to produce
/// `zk_drk_hash` and opaque refresh-token lookup keys.
pub fn sha256_b64url(data: &[u8]) -> String {
    b64url_encode(&sha256(data))
}

/// Compares two byte slices in constant time. Every comparison against a
/// secret-derived value (backup-code hash, CSRF token, stored refresh-token
/// hash) must go through this, never `==`.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Fills a buffer of the given length with cryptographically secure random
/// bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Generates an opaque, URL-safe random token of `byte_len` underlying
/// bytes (base64url-encoded, so the returned string is longer than
/// `byte_len`). Used for session ids, access/refresh tokens, and install
/// tokens — 32 bytes yields the 43-character tokens the external interface
/// documents.
pub fn random_token(byte_len: usize) -> String {
    b64url_encode(&random_bytes(byte_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_b64url_roundtrip() {
        let data = b"hello darkauth";
        let encoded = b64url_encode(data);
        assert!(!encoded.contains('='));
        assert_eq!(b64url_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_sha256_known_vector() {
        let digest = sha256(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"differ"));
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }

    #[test]
    fn test_random_token_length_and_uniqueness() {
        let a = random_token(32);
        let b = random_token(32);
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }
}
