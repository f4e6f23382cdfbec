//! # Signing Key Repository
//!
//! Backs the JWKS/signing-key lifecycle (component #4). Exactly one row has
//! `state = current`; the invariant is enforced at the service layer
//! (`service::jwks_service`), this repository only executes what it's told.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::PgPool;

use crate::domain::{SigningKeyRow, SigningKeyState};

#[derive(Debug, Clone)]
pub struct SigningKeyRepository {
    pool: PgPool,
}

impl SigningKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        kid: &str,
        public_jwk: serde_json::Value,
        private_jwk_encrypted: &[u8],
        state: SigningKeyState,
    ) -> Result<SigningKeyRow, ApiError> {
        sqlx::query_as::<_, SigningKeyRow>(
            r#"
            INSERT INTO signing_keys (kid, public_jwk, private_jwk_encrypted, state, created_at, rotated_at)
            VALUES ($1, $2, $3, $4, NOW(), NULL)
            RETURNING *
            "#,
        )
        .bind(kid)
        .bind(public_jwk)
        .bind(private_jwk_encrypted)
        .bind(state)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find_current(&self) -> Result<Option<SigningKeyRow>, ApiError> {
        sqlx::query_as::<_, SigningKeyRow>("SELECT * FROM signing_keys WHERE state = 'current'")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find_by_kid(&self, kid: &str) -> Result<Option<SigningKeyRow>, ApiError> {
        sqlx::query_as::<_, SigningKeyRow>("SELECT * FROM signing_keys WHERE kid = $1")
            .bind(kid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Public JWKS set: current plus any retired key still within its grace
    /// window, so tokens it signed remain verifiable.
    pub async fn list_published(&self, grace_cutoff: DateTime<Utc>) -> Result<Vec<SigningKeyRow>, ApiError> {
        sqlx::query_as::<_, SigningKeyRow>(
            r#"
            SELECT * FROM signing_keys
            WHERE state = 'current'
               OR (state = 'retired' AND rotated_at > $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(grace_cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn retire(&self, kid: &str) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE signing_keys SET state = 'retired', rotated_at = NOW() WHERE kid = $1",
        )
        .bind(kid)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    pub async fn delete_past_grace(&self, grace_cutoff: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "DELETE FROM signing_keys WHERE state = 'retired' AND rotated_at <= $1",
        )
        .bind(grace_cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected())
    }
}
