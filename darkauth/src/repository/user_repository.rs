//! # User Repository
//!
//! CRUD and directory-listing access for [`crate::domain::User`]. The OPAQUE
//! envelope that actually authenticates a user lives in a separate table,
//! see [`super::opaque_repository`].

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::User;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a user row. Callers persist the OPAQUE envelope in the same
    /// logical transaction via [`super::opaque_repository::OpaqueRepository::create_envelope`].
    pub async fn create(&self, email: &str, name: &str) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (sub, email, name, email_verified, password_reset_required)
            VALUES (gen_random_uuid(), lower($1), $2, false, false)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("users_email_key") {
                    return ApiError::Conflict { resource: "email".to_string() };
                }
            }
            ApiError::InternalError { message: format!("database error: {e}") }
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find_by_sub(&self, sub: Uuid) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE sub = $1")
            .bind(sub)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Paginated user directory, ordered by creation for stable pages.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, ApiError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at ASC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn set_email_verified(&self, sub: Uuid, verified: bool) -> Result<(), ApiError> {
        let result = sqlx::query(
            "UPDATE users SET email_verified = $1, updated_at = NOW() WHERE sub = $2",
        )
        .bind(verified)
        .bind(sub)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "user".to_string() });
        }
        Ok(())
    }

    pub async fn set_password_reset_required(&self, sub: Uuid, required: bool) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE users SET password_reset_required = $1, updated_at = NOW() WHERE sub = $2",
        )
        .bind(required)
        .bind(sub)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    /// Deletes a user. The schema cascades envelope, sessions, DRK material,
    /// and group memberships via foreign keys (`ON DELETE CASCADE`).
    pub async fn delete(&self, sub: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE sub = $1")
            .bind(sub)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "user".to_string() });
        }
        Ok(())
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = lower($1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(count.0 > 0)
    }
}

#[cfg(test)]
mod tests {
    // Integration tests against a live Postgres are marked `#[ignore]`.
    use super::*;

    #[test]
    fn test_repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UserRepository>();
    }
}
