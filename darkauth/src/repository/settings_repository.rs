//! # Settings Repository
//!
//! Backs typed, categorized installation settings. Redaction of
//! `secure = true` values on read is a service-layer concern
//! (`service::settings_service`) — this repository always returns the raw
//! row so the service can decide who gets the unredacted value.

use shared::errors::ApiError;
use sqlx::PgPool;

use crate::domain::{Setting, SettingType};

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(
        &self,
        key: &str,
        category: &str,
        setting_type: SettingType,
        value: serde_json::Value,
        default_value: serde_json::Value,
        secure: bool,
    ) -> Result<Setting, ApiError> {
        sqlx::query_as::<_, Setting>(
            r#"
            INSERT INTO settings (key, category, setting_type, value, default_value, secure)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(category)
        .bind(setting_type)
        .bind(value)
        .bind(default_value)
        .bind(secure)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find(&self, key: &str) -> Result<Option<Setting>, ApiError> {
        sqlx::query_as::<_, Setting>("SELECT * FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Setting>, ApiError> {
        sqlx::query_as::<_, Setting>(
            "SELECT * FROM settings WHERE ($1::text IS NULL OR category = $1) ORDER BY key ASC",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn set_value(&self, key: &str, value: serde_json::Value) -> Result<Option<Setting>, ApiError> {
        sqlx::query_as::<_, Setting>("UPDATE settings SET value = $2 WHERE key = $1 RETURNING *")
            .bind(key)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn reset_to_default(&self, key: &str) -> Result<Option<Setting>, ApiError> {
        sqlx::query_as::<_, Setting>(
            "UPDATE settings SET value = default_value WHERE key = $1 RETURNING *",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }
}
