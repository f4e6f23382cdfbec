//! # Installation Bootstrap Repository
//!
//! Backs component #13. Install state is the `installed` row in `settings`;
//! the install token lives in its own single-row table so it can be
//! consumed with the same compare-and-delete pattern as every other
//! single-use secret in this codebase.

use shared::errors::ApiError;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct InstallRepository {
    pool: PgPool,
}

impl InstallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn is_installed(&self) -> Result<bool, ApiError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = 'installed'")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(row.map(|(v,)| v.as_bool().unwrap_or(false)).unwrap_or(false))
    }

    /// Seeds the single-use install token at first boot. Overwrites any
    /// stale unconsumed token, since only one install attempt is ever live.
    pub async fn seed_token(&self, token_hash: &str) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO install_tokens (id, token_hash, consumed_at)
            VALUES (1, $1, NULL)
            ON CONFLICT (id) DO UPDATE SET token_hash = EXCLUDED.token_hash, consumed_at = NULL
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    pub async fn token_is_valid(&self, token_hash: &str) -> Result<bool, ApiError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM install_tokens WHERE token_hash = $1 AND consumed_at IS NULL",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(row.is_some())
    }

    /// Consumes the token and flips `installed=true` as one statement pair.
    /// Returns `false` if the token was already consumed (or never
    /// matched), so a retried or raced `/install/complete` call is a no-op
    /// rather than a second bootstrap.
    pub async fn complete_install(&self, token_hash: &str) -> Result<bool, ApiError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        let result = sqlx::query(
            "UPDATE install_tokens SET consumed_at = NOW() WHERE token_hash = $1 AND consumed_at IS NULL",
        )
        .bind(token_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE settings SET value = 'true'::jsonb WHERE key = 'installed'",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        tx.commit()
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        Ok(true)
    }
}
