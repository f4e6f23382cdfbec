//! # Authorization Pipeline Repository
//!
//! Backs component #9: pending-authorization rows created at `/authorize`
//! and bound during `/authorize/finalize`, and the single-use authorization
//! codes exchanged at `/token`.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{AuthorizationCode, PendingAuthorization};

#[derive(Debug, Clone)]
pub struct AuthorizationRepository {
    pool: PgPool,
}

impl AuthorizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // PENDING AUTHORIZATION
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn create_pending(
        &self,
        client_id: &str,
        redirect_uri: &str,
        response_type: &str,
        scope: &str,
        state: Option<&str>,
        nonce: Option<&str>,
        code_challenge: Option<&str>,
        code_challenge_method: Option<&str>,
        zk_pub_jwk: Option<serde_json::Value>,
        origin: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PendingAuthorization, ApiError> {
        sqlx::query_as::<_, PendingAuthorization>(
            r#"
            INSERT INTO pending_authorizations (
                request_id, client_id, redirect_uri, response_type, scope, state, nonce,
                code_challenge, code_challenge_method, zk_pub_jwk, user_sub, origin,
                created_at, expires_at
            )
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, NOW(), $11)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(redirect_uri)
        .bind(response_type)
        .bind(scope)
        .bind(state)
        .bind(nonce)
        .bind(code_challenge)
        .bind(code_challenge_method)
        .bind(zk_pub_jwk)
        .bind(origin)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find_pending(&self, request_id: Uuid) -> Result<Option<PendingAuthorization>, ApiError> {
        sqlx::query_as::<_, PendingAuthorization>(
            "SELECT * FROM pending_authorizations WHERE request_id = $1 AND expires_at > NOW()",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn bind_user(&self, request_id: Uuid, user_sub: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query(
            "UPDATE pending_authorizations SET user_sub = $1 WHERE request_id = $2 AND expires_at > NOW()",
        )
        .bind(user_sub)
        .bind(request_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "pending_authorization".to_string() });
        }
        Ok(())
    }

    /// Consumes (deletes) the pending-authorization row when it is exchanged
    /// for an authorization code.
    pub async fn consume_pending(&self, request_id: Uuid) -> Result<Option<PendingAuthorization>, ApiError> {
        sqlx::query_as::<_, PendingAuthorization>(
            "DELETE FROM pending_authorizations WHERE request_id = $1 AND expires_at > NOW() RETURNING *",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn delete_expired_pending(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM pending_authorizations WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // AUTHORIZATION CODES
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn create_code(
        &self,
        code: &str,
        request_id: Uuid,
        user_sub: Uuid,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        nonce: Option<&str>,
        code_challenge: Option<&str>,
        code_challenge_method: Option<&str>,
        expires_at: DateTime<Utc>,
        drk_jwe: Option<&str>,
        otp_verified: bool,
    ) -> Result<AuthorizationCode, ApiError> {
        sqlx::query_as::<_, AuthorizationCode>(
            r#"
            INSERT INTO authorization_codes (
                code, request_id, user_sub, client_id, redirect_uri, scope, nonce,
                code_challenge, code_challenge_method, created_at, expires_at, drk_jwe,
                otp_verified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(request_id)
        .bind(user_sub)
        .bind(client_id)
        .bind(redirect_uri)
        .bind(scope)
        .bind(nonce)
        .bind(code_challenge)
        .bind(code_challenge_method)
        .bind(expires_at)
        .bind(drk_jwe)
        .bind(otp_verified)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Compare-and-consume: deletes the code and returns it iff it still
    /// exists and has not expired. A second call for the same code — the
    /// single-use-reuse scenario — returns `None`, which the service layer
    /// maps to `invalid_grant`.
    pub async fn consume_code(&self, code: &str) -> Result<Option<AuthorizationCode>, ApiError> {
        sqlx::query_as::<_, AuthorizationCode>(
            "DELETE FROM authorization_codes WHERE code = $1 AND expires_at > NOW() RETURNING *",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn delete_expired_codes(&self) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM authorization_codes WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected())
    }
}
