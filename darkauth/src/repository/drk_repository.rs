//! # Zero-Knowledge DRK Custody Repository
//!
//! Stores the three server-opaque blobs in component #10: a user's wrapped
//! DRK, their published encryption public JWK, and an optional wrapped
//! private JWK for client-side recovery. None of these columns are ever
//! decrypted server-side — they round-trip byte-identical.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{UserEncPrivJwkWrapped, UserEncPubJwk, WrappedDrk};

#[derive(Debug, Clone)]
pub struct DrkRepository {
    pool: PgPool,
}

impl DrkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn put_wrapped_drk(&self, user_sub: Uuid, bytes: &[u8]) -> Result<WrappedDrk, ApiError> {
        sqlx::query_as::<_, WrappedDrk>(
            r#"
            INSERT INTO wrapped_drks (user_sub, wrapped_drk_bytes, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_sub) DO UPDATE SET wrapped_drk_bytes = EXCLUDED.wrapped_drk_bytes, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_sub)
        .bind(bytes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn get_wrapped_drk(&self, user_sub: Uuid) -> Result<Option<WrappedDrk>, ApiError> {
        sqlx::query_as::<_, WrappedDrk>("SELECT * FROM wrapped_drks WHERE user_sub = $1")
            .bind(user_sub)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn put_enc_pub_jwk(&self, user_sub: Uuid, jwk: serde_json::Value) -> Result<UserEncPubJwk, ApiError> {
        sqlx::query_as::<_, UserEncPubJwk>(
            r#"
            INSERT INTO user_enc_pub_jwks (user_sub, jwk, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_sub) DO UPDATE SET jwk = EXCLUDED.jwk, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_sub)
        .bind(jwk)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn get_enc_pub_jwk(&self, user_sub: Uuid) -> Result<Option<UserEncPubJwk>, ApiError> {
        sqlx::query_as::<_, UserEncPubJwk>("SELECT * FROM user_enc_pub_jwks WHERE user_sub = $1")
            .bind(user_sub)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn put_enc_priv_jwk_wrapped(
        &self,
        user_sub: Uuid,
        bytes: &[u8],
    ) -> Result<UserEncPrivJwkWrapped, ApiError> {
        sqlx::query_as::<_, UserEncPrivJwkWrapped>(
            r#"
            INSERT INTO user_enc_priv_jwks_wrapped (user_sub, wrapped_jwk_bytes, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_sub) DO UPDATE SET wrapped_jwk_bytes = EXCLUDED.wrapped_jwk_bytes, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_sub)
        .bind(bytes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn get_enc_priv_jwk_wrapped(
        &self,
        user_sub: Uuid,
    ) -> Result<Option<UserEncPrivJwkWrapped>, ApiError> {
        sqlx::query_as::<_, UserEncPrivJwkWrapped>(
            "SELECT * FROM user_enc_priv_jwks_wrapped WHERE user_sub = $1",
        )
        .bind(user_sub)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }
}
