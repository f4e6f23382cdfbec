//! # OPAQUE Envelope / Login Session Repository
//!
//! Backs the OPAQUE engine (component #3): one `user_envelope`/`admin_envelope`
//! row per principal, and short-lived `opaque_login_session` rows between
//! `start` and `finish`. Nothing outside [`crate::service::opaque_service`]
//! should read these tables.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ActorClass, OpaqueLoginSession, UserEnvelope};

#[derive(Debug, Clone)]
pub struct OpaqueRepository {
    pool: PgPool,
}

impl OpaqueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // REGISTRATION ENVELOPES
    // =========================================================================

    pub async fn create_envelope(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        record: &[u8],
        identity_u_encrypted: &[u8],
        identity_s: &str,
    ) -> Result<UserEnvelope, ApiError> {
        sqlx::query_as::<_, UserEnvelope>(
            r#"
            INSERT INTO opaque_envelopes (actor_class, principal_id, record, identity_u_encrypted, identity_s, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (actor_class, principal_id) DO UPDATE
                SET record = EXCLUDED.record,
                    identity_u_encrypted = EXCLUDED.identity_u_encrypted,
                    identity_s = EXCLUDED.identity_s,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(actor_class)
        .bind(principal_id)
        .bind(record)
        .bind(identity_u_encrypted)
        .bind(identity_s)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find_envelope(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
    ) -> Result<Option<UserEnvelope>, ApiError> {
        sqlx::query_as::<_, UserEnvelope>(
            "SELECT * FROM opaque_envelopes WHERE actor_class = $1 AND principal_id = $2",
        )
        .bind(actor_class)
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    // =========================================================================
    // LOGIN SESSIONS
    // =========================================================================

    /// Creates a login-session row with a TTL capped at 120s by the caller.
    pub async fn create_login_session(
        &self,
        actor_class: ActorClass,
        server_state: &[u8],
        identity_u_encrypted: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<OpaqueLoginSession, ApiError> {
        sqlx::query_as::<_, OpaqueLoginSession>(
            r#"
            INSERT INTO opaque_login_sessions (session_id, actor_class, server_state, identity_u_encrypted, created_at, expires_at)
            VALUES (gen_random_uuid(), $1, $2, $3, NOW(), $4)
            RETURNING *
            "#,
        )
        .bind(actor_class)
        .bind(server_state)
        .bind(identity_u_encrypted)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Compare-and-consume: deletes the row and returns it iff it still
    /// exists and has not expired. Two concurrent `finish` calls for the
    /// same `session_id` race on this statement; exactly one gets `Some`.
    pub async fn consume_login_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<OpaqueLoginSession>, ApiError> {
        sqlx::query_as::<_, OpaqueLoginSession>(
            r#"
            DELETE FROM opaque_login_sessions
            WHERE session_id = $1 AND expires_at > NOW()
            RETURNING *
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn delete_expired_login_sessions(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM opaque_login_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected())
    }
}
