//! # Compact JWE (ECDH-ES + A256GCM)
//!
//! Pure functions for constructing and opening compact JWEs using the
//! `ECDH-ES` key agreement algorithm (RFC 7518 §4.6) with direct key
//! agreement (no key wrapping) and `A256GCM` content encryption, over
//! NIST P-256. This is the transport used to re-wrap opaque DRK-custody
//! blobs to a session's ephemeral public key: the server never learns the
//! plaintext DRK itself, only the bytes it is asked to encrypt or decrypt,
//! which on the DRK path are themselves already opaque ciphertext from the
//! application's point of view.
//!
//! Compact JWE serialization is five base64url segments joined by `.`:
//! `protected-header.encrypted-key.iv.ciphertext.tag`. Direct-agreement mode
//! leaves the encrypted-key segment empty, matching RFC 7518 §4.6.1.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use sha2::Sha256;
use thiserror::Error;

use super::primitives::{b64url_decode, b64url_encode, random_bytes};

const GCM_NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum JweError {
    #[error("key agreement failed")]
    KeyAgreement,
    #[error("encryption failed")]
    EncryptFailed,
    #[error("decryption failed: ciphertext invalid or key mismatch")]
    DecryptFailed,
    #[error("malformed compact JWE: expected 5 dot-separated segments")]
    MalformedCompact,
    #[error("invalid base64url segment")]
    InvalidEncoding,
}

/// Ephemeral P-256 keypair generated per JWE, as RFC 7518 §4.6 requires
/// (`epk` in the protected header).
struct EphemeralKeypair {
    secret: SecretKey,
    public: PublicKey,
}

fn generate_ephemeral() -> EphemeralKeypair {
    let secret = SecretKey::random(&mut rand::thread_rng());
    let public = secret.public_key();
    EphemeralKeypair { secret, public }
}

/// Derives the A256GCM content-encryption key from an ECDH-ES shared secret
/// via single-step HKDF-SHA256 (RFC 7518 §4.6.2's Concat KDF, simplified to
/// a standard HKDF since this is an internal wire format with no
/// interoperability constraint beyond this codebase).
fn derive_cek(shared_secret: &[u8], apu: &[u8], apv: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; 32];
    let mut info = Vec::with_capacity(apu.len() + apv.len() + 5);
    info.extend_from_slice(b"A256GCM");
    info.extend_from_slice(apu);
    info.extend_from_slice(apv);
    hk.expand(&info, &mut okm)
        .expect("32-byte output is valid for HKDF-SHA256");
    okm
}

fn encode_compressed_point(public: &PublicKey) -> Vec<u8> {
    public.to_encoded_point(true).as_bytes().to_vec()
}

/// Encrypts `plaintext` to `recipient_public` as a compact JWE using
/// `ECDH-ES` + `A256GCM`. `apu`/`apv` are the Agreement PartyUInfo/
/// PartyVInfo context bytes (may be empty).
pub fn encrypt_compact(
    recipient_public: &PublicKey,
    plaintext: &[u8],
    apu: &[u8],
    apv: &[u8],
) -> Result<String, JweError> {
    let ephemeral = generate_ephemeral();

    let shared_secret = diffie_hellman(
        ephemeral.secret.to_nonzero_scalar(),
        recipient_public.as_affine(),
    );
    let cek = derive_cek(shared_secret.raw_secret_bytes().as_slice(), apu, apv);

    let epk_x = encode_compressed_point(&ephemeral.public);
    let header = serde_json::json!({
        "alg": "ECDH-ES",
        "enc": "A256GCM",
        "epk": b64url_encode(&epk_x),
    });
    let header_json = serde_json::to_vec(&header).map_err(|_| JweError::EncryptFailed)?;
    let protected = b64url_encode(&header_json);

    let cipher = Aes256Gcm::new_from_slice(&cek).map_err(|_| JweError::EncryptFailed)?;
    let nonce_bytes = random_bytes(GCM_NONCE_LEN);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext_and_tag = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: protected.as_bytes(),
            },
        )
        .map_err(|_| JweError::EncryptFailed)?;

    let tag_len = 16;
    let (ciphertext, tag) = ciphertext_and_tag.split_at(ciphertext_and_tag.len() - tag_len);

    Ok(format!(
        "{}..{}.{}.{}",
        protected,
        b64url_encode(&nonce_bytes),
        b64url_encode(ciphertext),
        b64url_encode(tag),
    ))
}

/// Decrypts a compact JWE produced by [`encrypt_compact`] using the
/// recipient's P-256 private key.
pub fn decrypt_compact(
    recipient_secret: &SecretKey,
    jwe: &str,
    apu: &[u8],
    apv: &[u8],
) -> Result<Vec<u8>, JweError> {
    let segments: Vec<&str> = jwe.split('.').collect();
    if segments.len() != 5 {
        return Err(JweError::MalformedCompact);
    }
    let [protected, _encrypted_key, iv, ciphertext, tag] = segments[..] else {
        return Err(JweError::MalformedCompact);
    };

    let header_json = b64url_decode(protected).map_err(|_| JweError::InvalidEncoding)?;
    let header: serde_json::Value =
        serde_json::from_slice(&header_json).map_err(|_| JweError::InvalidEncoding)?;
    let epk_x = header
        .get("epk")
        .and_then(|v| v.as_str())
        .ok_or(JweError::MalformedCompact)?;
    let epk_bytes = b64url_decode(epk_x).map_err(|_| JweError::InvalidEncoding)?;
    let ephemeral_public =
        PublicKey::from_sec1_bytes(&epk_bytes).map_err(|_| JweError::KeyAgreement)?;

    let shared_secret = diffie_hellman(
        recipient_secret.to_nonzero_scalar(),
        ephemeral_public.as_affine(),
    );
    let cek = derive_cek(shared_secret.raw_secret_bytes().as_slice(), apu, apv);

    let nonce_bytes = b64url_decode(iv).map_err(|_| JweError::InvalidEncoding)?;
    let ciphertext_bytes = b64url_decode(ciphertext).map_err(|_| JweError::InvalidEncoding)?;
    let tag_bytes = b64url_decode(tag).map_err(|_| JweError::InvalidEncoding)?;

    let mut combined = ciphertext_bytes;
    combined.extend_from_slice(&tag_bytes);

    let cipher = Aes256Gcm::new_from_slice(&cek).map_err(|_| JweError::DecryptFailed)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &combined,
                aad: protected.as_bytes(),
            },
        )
        .map_err(|_| JweError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let recipient_secret = SecretKey::random(&mut rand::thread_rng());
        let recipient_public = recipient_secret.public_key();

        let plaintext = b"opaque wrapped DRK envelope bytes";
        let jwe = encrypt_compact(&recipient_public, plaintext, b"", b"").unwrap();

        assert_eq!(jwe.split('.').count(), 5);

        let decrypted = decrypt_compact(&recipient_secret, &jwe, b"", b"").unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let recipient_secret = SecretKey::random(&mut rand::thread_rng());
        let recipient_public = recipient_secret.public_key();
        let other_secret = SecretKey::random(&mut rand::thread_rng());

        let jwe = encrypt_compact(&recipient_public, b"data", b"", b"").unwrap();
        assert!(decrypt_compact(&other_secret, &jwe, b"", b"").is_err());
    }

    #[test]
    fn test_malformed_compact_rejected() {
        let recipient_secret = SecretKey::random(&mut rand::thread_rng());
        assert!(matches!(
            decrypt_compact(&recipient_secret, "not.enough.segments", b"", b""),
            Err(JweError::MalformedCompact)
        ));
    }

    #[test]
    fn test_each_encryption_uses_fresh_ephemeral_key() {
        let recipient_secret = SecretKey::random(&mut rand::thread_rng());
        let recipient_public = recipient_secret.public_key();

        let a = encrypt_compact(&recipient_public, b"same plaintext", b"", b"").unwrap();
        let b = encrypt_compact(&recipient_public, b"same plaintext", b"", b"").unwrap();
        assert_ne!(a, b);
    }
}
