//! # Settings Service
//!
//! Thin wrapper over [`SettingsRepository`] that owns the one policy the
//! repository deliberately stays ignorant of: a `secure = true` setting's
//! `value` is redacted on every read except an explicit admin-only raw read.

use serde_json::Value;
use shared::errors::ApiError;

use crate::domain::{Setting, SettingType};
use crate::repository::SettingsRepository;

const REDACTED_PLACEHOLDER: &str = "********";

#[derive(Clone)]
pub struct SettingsService {
    repository: SettingsRepository,
}

impl SettingsService {
    pub fn new(repository: SettingsRepository) -> Self {
        Self { repository }
    }

    pub async fn upsert(
        &self,
        key: &str,
        category: &str,
        setting_type: SettingType,
        value: Value,
        default_value: Value,
        secure: bool,
    ) -> Result<Setting, ApiError> {
        self.repository.upsert(key, category, setting_type, value, default_value, secure).await
    }

    /// Redacted read: returns `********` in place of `value` for any
    /// `secure = true` row.
    pub async fn get(&self, key: &str) -> Result<Option<Setting>, ApiError> {
        Ok(self.repository.find(key).await?.map(redact))
    }

    /// Unredacted read, for the handful of call sites that must see the real
    /// value (the KEK status endpoint, OPAQUE server-setup bootstrap).
    pub async fn get_raw(&self, key: &str) -> Result<Option<Setting>, ApiError> {
        self.repository.find(key).await
    }

    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Setting>, ApiError> {
        Ok(self.repository.list(category).await?.into_iter().map(redact).collect())
    }

    pub async fn set_value(&self, key: &str, value: Value) -> Result<Setting, ApiError> {
        let setting = self
            .repository
            .set_value(key, value)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "setting".to_string() })?;
        Ok(redact(setting))
    }

    pub async fn reset_to_default(&self, key: &str) -> Result<Setting, ApiError> {
        let setting = self
            .repository
            .reset_to_default(key)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "setting".to_string() })?;
        Ok(redact(setting))
    }
}

fn redact(mut setting: Setting) -> Setting {
    if setting.secure {
        setting.value = Value::String(REDACTED_PLACEHOLDER.to_string());
    }
    setting
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(secure: bool) -> Setting {
        Setting {
            key: "opaque.server_setup".to_string(),
            category: "opaque".to_string(),
            setting_type: SettingType::String,
            value: Value::String("plaintext-secret".to_string()),
            default_value: Value::Null,
            secure,
        }
    }

    #[test]
    fn test_redact_masks_secure_values() {
        let redacted = redact(sample(true));
        assert_eq!(redacted.value, Value::String(REDACTED_PLACEHOLDER.to_string()));
    }

    #[test]
    fn test_redact_leaves_non_secure_values_untouched() {
        let untouched = redact(sample(false));
        assert_eq!(untouched.value, Value::String("plaintext-secret".to_string()));
    }
}
