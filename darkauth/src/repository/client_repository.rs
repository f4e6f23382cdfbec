//! # OAuth Client Repository
//!
//! CRUD for registered relying parties (`Client`). Public clients must
//! require PKCE; confidential clients get a KEK-encrypted secret — both
//! invariants are enforced by `service::authorization_service`, not here.

use shared::errors::ApiError;
use sqlx::PgPool;

use crate::domain::{Client, ClientType};

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        client_id: &str,
        client_type: ClientType,
        name: &str,
        redirect_uris: &[String],
        grant_types: &[String],
        token_endpoint_auth_method: &str,
        secret_encrypted: Option<&[u8]>,
        require_pkce: bool,
        allowed_scopes: &[String],
    ) -> Result<Client, ApiError> {
        sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                client_id, client_type, name, redirect_uris, grant_types,
                token_endpoint_auth_method, secret_encrypted, require_pkce, allowed_scopes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(client_type)
        .bind(name)
        .bind(redirect_uris)
        .bind(grant_types)
        .bind(token_endpoint_auth_method)
        .bind(secret_encrypted)
        .bind(require_pkce)
        .bind(allowed_scopes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("clients_pkey") {
                    return ApiError::Conflict { resource: "client_id".to_string() };
                }
            }
            ApiError::InternalError { message: format!("database error: {e}") }
        })
    }

    pub async fn find(&self, client_id: &str) -> Result<Option<Client>, ApiError> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE client_id = $1")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn list(&self) -> Result<Vec<Client>, ApiError> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY client_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn delete(&self, client_id: &str) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource: "client".to_string() });
        }
        Ok(())
    }
}
