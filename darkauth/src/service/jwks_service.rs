//! # JWKS / Signing-Key Lifecycle
//!
//! Maintains the invariant that exactly one signing key has `state=current`
//! (component #4). Rotation keeps the retired key published for a grace
//! window so tokens it already signed stay verifiable.

use chrono::{Duration as ChronoDuration, Utc};
use ed25519_dalek::{Signer, SigningKey};
use shared::{
    crypto::{jwks::Jwk, kek::Kek, primitives::random_token},
    errors::ApiError,
};
use std::sync::Arc;

use crate::domain::SigningKeyState;
use crate::repository::SigningKeyRepository;

const GRACE_WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct JwksService {
    repository: SigningKeyRepository,
    kek: Arc<Kek>,
}

impl JwksService {
    pub fn new(repository: SigningKeyRepository, kek: Arc<Kek>) -> Self {
        Self { repository, kek }
    }

    /// Ensures a current signing key exists, generating the installation's
    /// first one if none does. Refuses to run with no available KEK —
    /// callers outside development mode must not reach this path without one.
    pub async fn ensure_current_key(&self) -> Result<(), ApiError> {
        if self.repository.find_current().await?.is_some() {
            return Ok(());
        }
        if !self.kek.available() {
            return Err(ApiError::ServiceUnavailable { service: "kek".to_string() });
        }
        self.generate_and_store_key(SigningKeyState::Current).await?;
        Ok(())
    }

    /// Generates a new current key, demoting the previous one to retired
    /// with `rotated_at = now`, so it stays in the published set for
    /// [`GRACE_WINDOW_HOURS`].
    pub async fn rotate(&self) -> Result<String, ApiError> {
        let previous = self.repository.find_current().await?;
        let new_kid = self.generate_and_store_key(SigningKeyState::Current).await?;
        if let Some(previous) = previous {
            self.repository.retire(&previous.kid).await?;
        }
        Ok(new_kid)
    }

    /// The current signing key's Ed25519 keypair, unsealed, for signing ID
    /// tokens and client-credentials access tokens.
    pub async fn current_signing_key(&self) -> Result<(String, SigningKey), ApiError> {
        let row = self
            .repository
            .find_current()
            .await?
            .ok_or(ApiError::ServiceUnavailable { service: "jwks".to_string() })?;

        let private_bytes = self
            .kek
            .unseal(&row.private_jwk_encrypted)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
        let jwk: Jwk = serde_json::from_slice(&private_bytes)
            .map_err(|e| ApiError::InternalError { message: format!("corrupt private JWK: {e}") })?;
        let signing_key = jwk
            .to_signing_key()
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        Ok((row.kid, signing_key))
    }

    /// The public JWKS document: the current key plus any retired key still
    /// within its grace window.
    pub async fn public_jwks(&self) -> Result<shared::crypto::jwks::Jwks, ApiError> {
        let cutoff = Utc::now() - ChronoDuration::hours(GRACE_WINDOW_HOURS);
        let rows = self.repository.list_published(cutoff).await?;
        let keys = rows
            .into_iter()
            .map(|row| serde_json::from_value::<Jwk>(row.public_jwk))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::InternalError { message: format!("corrupt public JWK: {e}") })?;
        Ok(shared::crypto::jwks::Jwks { keys })
    }

    /// Signs `claims` as a compact EdDSA JWS using the current signing key.
    pub async fn sign_jws(&self, claims: &serde_json::Value) -> Result<String, ApiError> {
        let (kid, signing_key) = self.current_signing_key().await?;

        let header = serde_json::json!({ "alg": "EdDSA", "typ": "JWT", "kid": kid });
        let header_b64 = shared::crypto::primitives::b64url_encode(
            &serde_json::to_vec(&header).map_err(|e| ApiError::InternalError { message: e.to_string() })?,
        );
        let claims_b64 = shared::crypto::primitives::b64url_encode(
            &serde_json::to_vec(claims).map_err(|e| ApiError::InternalError { message: e.to_string() })?,
        );
        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = signing_key.sign(signing_input.as_bytes());

        Ok(format!(
            "{signing_input}.{}",
            shared::crypto::primitives::b64url_encode(&signature.to_bytes())
        ))
    }

    async fn generate_and_store_key(&self, state: SigningKeyState) -> Result<String, ApiError> {
        if !self.kek.available() {
            return Err(ApiError::ServiceUnavailable { service: "kek".to_string() });
        }

        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let kid = random_token(16);
        let full_jwk = Jwk::from_signing_key(&signing_key, &kid);
        let public_jwk = serde_json::to_value(full_jwk.public_only())
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
        let private_bytes =
            serde_json::to_vec(&full_jwk).map_err(|e| ApiError::InternalError { message: e.to_string() })?;
        let private_jwk_encrypted = self
            .kek
            .seal(&private_bytes)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        self.repository
            .insert(&kid, public_jwk, &private_jwk_encrypted, state)
            .await?;
        Ok(kid)
    }
}
