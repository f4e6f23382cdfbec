//! # OTP Enrollment Repository
//!
//! Backs component #7. The row's presence/absence is the state machine
//! itself (see [`crate::domain::OtpEnrollment`]'s doc comment): pending rows
//! have `verified_at = NULL`, enrolling writes one, verifying sets the
//! timestamp, and disabling deletes it.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ActorClass, OtpEnrollment};

#[derive(Debug, Clone)]
pub struct OtpRepository {
    pool: PgPool,
}

impl OtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts enrollment. Overwrites any unverified prior attempt so a user
    /// can restart a scan they abandoned; refuses to clobber a verified one
    /// (callers must disable first).
    pub async fn create_pending(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        secret_encrypted: &[u8],
    ) -> Result<OtpEnrollment, ApiError> {
        sqlx::query_as::<_, OtpEnrollment>(
            r#"
            INSERT INTO otp_enrollments (actor_class, principal_id, secret_encrypted, created_at, verified_at, backup_codes_hashed, last_used_at)
            VALUES ($1, $2, $3, NOW(), NULL, '{}', NULL)
            ON CONFLICT (actor_class, principal_id) DO UPDATE
                SET secret_encrypted = EXCLUDED.secret_encrypted, created_at = NOW(), verified_at = NULL, backup_codes_hashed = '{}'
                WHERE otp_enrollments.verified_at IS NULL
            RETURNING *
            "#,
        )
        .bind(actor_class)
        .bind(principal_id)
        .bind(secret_encrypted)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find(&self, actor_class: ActorClass, principal_id: Uuid) -> Result<Option<OtpEnrollment>, ApiError> {
        sqlx::query_as::<_, OtpEnrollment>(
            "SELECT * FROM otp_enrollments WHERE actor_class = $1 AND principal_id = $2",
        )
        .bind(actor_class)
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn verify(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        backup_codes_hashed: &[String],
    ) -> Result<OtpEnrollment, ApiError> {
        sqlx::query_as::<_, OtpEnrollment>(
            r#"
            UPDATE otp_enrollments
            SET verified_at = NOW(), backup_codes_hashed = $3
            WHERE actor_class = $1 AND principal_id = $2
            RETURNING *
            "#,
        )
        .bind(actor_class)
        .bind(principal_id)
        .bind(backup_codes_hashed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn record_use(&self, actor_class: ActorClass, principal_id: Uuid, used_at: DateTime<Utc>) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE otp_enrollments SET last_used_at = $3 WHERE actor_class = $1 AND principal_id = $2",
        )
        .bind(actor_class)
        .bind(principal_id)
        .bind(used_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    /// Consumes one backup code atomically: removes it from the array and
    /// returns the updated row only if it was present, so a code can never
    /// be used twice even under concurrent requests.
    pub async fn consume_backup_code(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        code_hash: &str,
    ) -> Result<Option<OtpEnrollment>, ApiError> {
        sqlx::query_as::<_, OtpEnrollment>(
            r#"
            UPDATE otp_enrollments
            SET backup_codes_hashed = array_remove(backup_codes_hashed, $3), last_used_at = NOW()
            WHERE actor_class = $1 AND principal_id = $2 AND $3 = ANY(backup_codes_hashed)
            RETURNING *
            "#,
        )
        .bind(actor_class)
        .bind(principal_id)
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn delete(&self, actor_class: ActorClass, principal_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM otp_enrollments WHERE actor_class = $1 AND principal_id = $2")
            .bind(actor_class)
            .bind(principal_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }
}
