//! # Audit Repository
//!
//! Append-only store for [`crate::domain::AuditEntry`]. No update or delete
//! by key is exposed deliberately; the only way rows leave this table is
//! retention pruning by age.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ActorClass, AuditEntry};

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        event_type: &str,
        actor_class: Option<ActorClass>,
        actor_id: Option<Uuid>,
        actor_email: Option<&str>,
        resource_type: Option<&str>,
        resource_id: Option<&str>,
        success: bool,
        ip: Option<&str>,
        user_agent: Option<&str>,
        details: Option<serde_json::Value>,
    ) -> Result<AuditEntry, ApiError> {
        sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO audit_entries (
                id, event_type, actor_class, actor_id, actor_email,
                resource_type, resource_id, success, ip, user_agent, timestamp, details
            )
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), $10)
            RETURNING *
            "#,
        )
        .bind(event_type)
        .bind(actor_class)
        .bind(actor_id)
        .bind(actor_email)
        .bind(resource_type)
        .bind(resource_id)
        .bind(success)
        .bind(ip)
        .bind(user_agent)
        .bind(details)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn list(
        &self,
        event_type: Option<&str>,
        actor_id: Option<Uuid>,
        since: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, ApiError> {
        sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT * FROM audit_entries
            WHERE ($1::text IS NULL OR event_type = $1)
              AND ($2::uuid IS NULL OR actor_id = $2)
              AND ($3::timestamptz IS NULL OR timestamp >= $3)
            ORDER BY timestamp DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(event_type)
        .bind(actor_id)
        .bind(since)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM audit_entries WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected())
    }
}
