//! # Session Repository
//!
//! Backs the session service (component #6): opaque session ids, sliding
//! 15-minute TTL, CSRF/refresh-token fields, and OTP step-up flags.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ActorClass, Session};

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        session_id: &str,
        actor_class: ActorClass,
        principal_id: Uuid,
        email: &str,
        name: &str,
        csrf_token: &str,
        refresh_token: &str,
        otp_required: bool,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, ApiError> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                session_id, actor_class, principal_id, email, name, csrf_token,
                refresh_token, otp_required, otp_verified, created_at, expires_at, last_seen
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, NOW(), $9, NOW())
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(actor_class)
        .bind(principal_id)
        .bind(email)
        .bind(name)
        .bind(csrf_token)
        .bind(refresh_token)
        .bind(otp_required)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find(&self, session_id: &str) -> Result<Option<Session>, ApiError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = $1 AND expires_at > NOW()")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Sliding-TTL touch: extends `expires_at` and bumps `last_seen`.
    pub async fn touch(&self, session_id: &str, new_expires_at: DateTime<Utc>) -> Result<(), ApiError> {
        sqlx::query("UPDATE sessions SET expires_at = $1, last_seen = NOW() WHERE session_id = $2")
            .bind(new_expires_at)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    pub async fn set_otp_verified(&self, session_id: &str, verified: bool) -> Result<(), ApiError> {
        sqlx::query("UPDATE sessions SET otp_verified = $1 WHERE session_id = $2")
            .bind(verified)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    /// Rotates the refresh token and extends expiry, the `/token`
    /// `grant_type=refresh_token` path. Old token must match or the rotation
    /// is rejected, implementing "a used refresh token is invalidated".
    pub async fn rotate_refresh_token(
        &self,
        session_id: &str,
        old_refresh_token: &str,
        new_refresh_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<Session>, ApiError> {
        sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET refresh_token = $1, expires_at = $2, last_seen = NOW()
            WHERE session_id = $3 AND refresh_token = $4 AND expires_at > NOW()
            RETURNING *
            "#,
        )
        .bind(new_refresh_token)
        .bind(new_expires_at)
        .bind(session_id)
        .bind(old_refresh_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Rotates by `refresh_token` alone, with no `session_id` in hand — the
    /// shape `/token`'s `grant_type=refresh_token` call actually has, since
    /// the client only ever carries the refresh token itself. Unique on
    /// `refresh_token` the same way `rotate_refresh_token` is unique on the
    /// `(session_id, refresh_token)` pair.
    pub async fn rotate_by_refresh_token(
        &self,
        old_refresh_token: &str,
        new_refresh_token: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<Session>, ApiError> {
        sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET refresh_token = $1, expires_at = $2, last_seen = NOW()
            WHERE refresh_token = $3 AND expires_at > NOW()
            RETURNING *
            "#,
        )
        .bind(new_refresh_token)
        .bind(new_expires_at)
        .bind(old_refresh_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn delete(&self, session_id: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    /// Cascades logically when a user or admin row is deleted directly; this
    /// explicit call covers stores where the foreign key isn't `ON DELETE
    /// CASCADE`.
    pub async fn delete_all_for_principal(&self, principal_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE principal_id = $1")
            .bind(principal_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected())
    }

    pub async fn list_for_principal(&self, principal_id: Uuid) -> Result<Vec<Session>, ApiError> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE principal_id = $1 AND expires_at > NOW() ORDER BY created_at DESC",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }
}
