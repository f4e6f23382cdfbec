//! # JWKS Representation
//!
//! A minimal, hand-rolled JWK/JWKS representation for Ed25519 (OKP, crv
//! `Ed25519`) keys, following RFC 7517 (JWK) and RFC 8037 (OKP key types)
//! field names directly rather than depending on a third-party JOSE-JWK
//! crate whose Ed25519/OKP coverage would need to be verified by compiling
//! it — something this exercise can't do. The fields below are exactly what
//! RFC 8037 §2 specifies for an OKP key, nothing more.

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::primitives::{b64url_decode, b64url_encode};

/// A single JSON Web Key. `d` (the private scalar) is present only for
/// private JWKs, which are never serialized to an HTTP response — only to
/// the KEK-sealed blob the signing-key repository persists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    /// Public key, base64url (the `x` coordinate for OKP keys).
    pub x: String,
    /// Private scalar, base64url. Absent on public JWKs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    pub kid: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub use_: String,
}

/// A JWK Set, the shape served at `/.well-known/jwks.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwk {
    /// Builds a public+private JWK pair for a freshly generated Ed25519
    /// signing key, tagged with `kid`.
    pub fn from_signing_key(signing_key: &SigningKey, kid: &str) -> Self {
        Self {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: b64url_encode(signing_key.verifying_key().as_bytes()),
            d: Some(b64url_encode(&signing_key.to_bytes())),
            kid: kid.to_string(),
            alg: "EdDSA".to_string(),
            use_: "sig".to_string(),
        }
    }

    /// Strips the private scalar, producing the public JWK safe to publish.
    pub fn public_only(&self) -> Self {
        Self {
            d: None,
            ..self.clone()
        }
    }

    /// Reconstructs the Ed25519 signing key from a private JWK.
    pub fn to_signing_key(&self) -> Result<SigningKey, JwkError> {
        let d = self.d.as_ref().ok_or(JwkError::NotAPrivateKey)?;
        let bytes = b64url_decode(d).map_err(|_| JwkError::InvalidEncoding)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| JwkError::InvalidKeyLength)?;
        Ok(SigningKey::from_bytes(&bytes))
    }

    /// Reconstructs the Ed25519 verifying key from a public (or private) JWK.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey, JwkError> {
        let bytes = b64url_decode(&self.x).map_err(|_| JwkError::InvalidEncoding)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| JwkError::InvalidKeyLength)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| JwkError::InvalidKeyPoint)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwkError {
    #[error("JWK has no private scalar")]
    NotAPrivateKey,
    #[error("JWK field is not valid base64url")]
    InvalidEncoding,
    #[error("JWK key material is not 32 bytes")]
    InvalidKeyLength,
    #[error("JWK key material is not a valid curve point")]
    InvalidKeyPoint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn test_public_only_strips_private_scalar() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let jwk = Jwk::from_signing_key(&signing_key, "key-1");
        assert!(jwk.d.is_some());
        let public = jwk.public_only();
        assert!(public.d.is_none());
        assert_eq!(public.x, jwk.x);
    }

    #[test]
    fn test_roundtrip_signing_key() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let jwk = Jwk::from_signing_key(&signing_key, "key-1");
        let recovered = jwk.to_signing_key().unwrap();
        assert_eq!(signing_key.to_bytes(), recovered.to_bytes());
    }

    #[test]
    fn test_public_only_cannot_recover_signing_key() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let jwk = Jwk::from_signing_key(&signing_key, "key-1").public_only();
        assert!(matches!(jwk.to_signing_key(), Err(JwkError::NotAPrivateKey)));
    }

    #[test]
    fn test_verifying_key_matches() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let jwk = Jwk::from_signing_key(&signing_key, "key-1");
        let verifying = jwk.to_verifying_key().unwrap();
        assert_eq!(verifying, signing_key.verifying_key());
    }

    #[test]
    fn test_jwk_fields_follow_rfc8037() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let jwk = Jwk::from_signing_key(&signing_key, "key-1");
        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.crv, "Ed25519");
        assert_eq!(jwk.alg, "EdDSA");
        assert_eq!(jwk.use_, "sig");
    }
}
