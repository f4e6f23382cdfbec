//! # Zero-Knowledge DRK Custody Service
//!
//! Wraps component #10. Every blob here is server-opaque: the wrapped DRK,
//! the optional wrapped private encryption JWK, and the re-wrapped
//! `drk_jwe` produced at `/authorize/finalize` are all computed client-side
//! against key material this server never holds (the OPAQUE export key).
//! This service stores and returns them verbatim, and binds the one fact
//! the server IS in a position to assert: the SHA-256 hash of whatever
//! `drk_jwe` bytes it was handed, so the SDK can catch a corrupted or
//! substituted URL fragment (§4.5, §8 invariant "DRK fragment integrity").

use shared::{crypto::primitives::sha256_b64url, errors::ApiError};
use uuid::Uuid;

use crate::domain::{UserEncPrivJwkWrapped, UserEncPubJwk, WrappedDrk};
use crate::repository::DrkRepository;

#[derive(Clone)]
pub struct DrkService {
    repository: DrkRepository,
}

impl DrkService {
    pub fn new(repository: DrkRepository) -> Self {
        Self { repository }
    }

    pub async fn put_wrapped_drk(&self, user_sub: Uuid, bytes: &[u8]) -> Result<WrappedDrk, ApiError> {
        self.repository.put_wrapped_drk(user_sub, bytes).await
    }

    pub async fn get_wrapped_drk(&self, user_sub: Uuid) -> Result<Option<WrappedDrk>, ApiError> {
        self.repository.get_wrapped_drk(user_sub).await
    }

    pub async fn put_enc_pub_jwk(&self, user_sub: Uuid, jwk: serde_json::Value) -> Result<UserEncPubJwk, ApiError> {
        self.repository.put_enc_pub_jwk(user_sub, jwk).await
    }

    pub async fn get_enc_pub_jwk(&self, user_sub: Uuid) -> Result<Option<UserEncPubJwk>, ApiError> {
        self.repository.get_enc_pub_jwk(user_sub).await
    }

    pub async fn put_enc_priv_jwk_wrapped(
        &self,
        user_sub: Uuid,
        bytes: &[u8],
    ) -> Result<UserEncPrivJwkWrapped, ApiError> {
        self.repository.put_enc_priv_jwk_wrapped(user_sub, bytes).await
    }

    pub async fn get_enc_priv_jwk_wrapped(&self, user_sub: Uuid) -> Result<Option<UserEncPrivJwkWrapped>, ApiError> {
        self.repository.get_enc_priv_jwk_wrapped(user_sub).await
    }

    /// Structural sanity check only — five dot-separated compact-JWE
    /// segments. The server never attempts to decrypt `drk_jwe`; it has
    /// no key that could.
    pub fn validate_drk_jwe_shape(&self, drk_jwe: &str) -> Result<(), ApiError> {
        if drk_jwe.split('.').count() == 5 {
            Ok(())
        } else {
            Err(ApiError::InvalidRequest { message: "drk_jwe is not a well-formed compact JWE".to_string() })
        }
    }

    /// `zk_drk_hash` bound into the ID token: `base64url(SHA256(drk_jwe))`.
    pub fn drk_jwe_hash(&self, drk_jwe: &str) -> String {
        sha256_b64url(drk_jwe.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_compact_jwe() -> String {
        "header..iv.ciphertext.tag".to_string()
    }

    #[test]
    fn test_validate_drk_jwe_shape_accepts_five_segments() {
        let service = DrkService::new(DrkRepository::new(unreachable_pool()));
        assert!(service.validate_drk_jwe_shape(&sample_compact_jwe()).is_ok());
        assert!(service.validate_drk_jwe_shape("too.few.segments").is_err());
    }

    #[test]
    fn test_drk_jwe_hash_is_deterministic() {
        let service = DrkService::new(DrkRepository::new(unreachable_pool()));
        let jwe = sample_compact_jwe();
        assert_eq!(service.drk_jwe_hash(&jwe), service.drk_jwe_hash(&jwe));
    }

    fn unreachable_pool() -> sqlx::PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool construction never touches the network")
    }
}
