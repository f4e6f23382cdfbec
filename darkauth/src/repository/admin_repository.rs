//! # Admin Repository
//!
//! CRUD for [`crate::domain::Admin`] rows. An admin's own row can never be
//! deleted or demoted by that same admin — enforced one layer up in
//! `service::rbac_service`, since "self" is a session-derived fact this
//! repository doesn't have access to.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Admin, AdminRole};

#[derive(Debug, Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, email: &str, name: &str, role: AdminRole) -> Result<Admin, ApiError> {
        sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (admin_id, email, name, role)
            VALUES (gen_random_uuid(), lower($1), $2, $3)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("admins_email_key") {
                    return ApiError::Conflict { resource: "email".to_string() };
                }
            }
            ApiError::InternalError { message: format!("database error: {e}") }
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, ApiError> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find_by_id(&self, admin_id: Uuid) -> Result<Option<Admin>, ApiError> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE admin_id = $1")
            .bind(admin_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn list(&self) -> Result<Vec<Admin>, ApiError> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn update_role(&self, admin_id: Uuid, role: AdminRole) -> Result<(), ApiError> {
        let result = sqlx::query("UPDATE admins SET role = $1, updated_at = NOW() WHERE admin_id = $2")
            .bind(role)
            .bind(admin_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "admin".to_string() });
        }
        Ok(())
    }

    pub async fn delete(&self, admin_id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM admins WHERE admin_id = $1")
            .bind(admin_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "admin".to_string() });
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, ApiError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(count.0)
    }
}
