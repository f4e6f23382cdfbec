//! # Audit Service
//!
//! Turns a [`DomainEvent`] into an append-only [`AuditEntry`] row (component
//! #12's audit half). Every mutating handler — whether it succeeded or
//! failed — routes through [`AuditService::record`], which is the one place
//! the "redact before it ever reaches storage" rule lives: passwords,
//! envelope bytes, export keys, DRK plaintext, and private JWKs must never
//! appear in `details`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::errors::ApiError;
use uuid::Uuid;

use crate::domain::events::DomainEvent;
use crate::domain::{ActorClass, AuditEntry};
use crate::repository::AuditRepository;

const RETENTION_DAYS: i64 = 90;

/// Fields an audit entry carries beyond what the event payload itself
/// encodes — who initiated the underlying HTTP request, and whether it
/// ultimately succeeded.
pub struct AuditContext {
    pub actor_class: Option<ActorClass>,
    pub actor_email: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn empty() -> Self {
        Self {
            actor_class: None,
            actor_email: None,
            resource_type: None,
            resource_id: None,
            ip: None,
            user_agent: None,
        }
    }
}

#[derive(Clone)]
pub struct AuditService {
    repository: AuditRepository,
}

impl AuditService {
    pub fn new(repository: AuditRepository) -> Self {
        Self { repository }
    }

    /// Records one audit entry for `event`. `success` reflects the
    /// *handler's* outcome (2xx vs 4xx/5xx), not just whether the database
    /// write itself succeeded.
    pub async fn record<T: DomainEvent>(
        &self,
        event: &T,
        success: bool,
        context: AuditContext,
    ) -> Result<AuditEntry, ApiError> {
        let details = serde_json::to_value(event).ok().map(redact);

        self.repository
            .insert(
                event.event_type(),
                context.actor_class,
                event.actor_id(),
                context.actor_email.as_deref(),
                context.resource_type.as_deref(),
                context.resource_id.as_deref(),
                success,
                context.ip.as_deref(),
                context.user_agent.as_deref(),
                details,
            )
            .await
    }

    pub async fn list(
        &self,
        event_type: Option<&str>,
        actor_id: Option<Uuid>,
        since: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, ApiError> {
        self.repository.list(event_type, actor_id, since, limit, offset).await
    }

    /// Prunes entries older than the retention window. Called from a
    /// periodic maintenance task, never from a request handler.
    pub async fn prune_expired(&self) -> Result<u64, ApiError> {
        let cutoff = Utc::now() - chrono::Duration::days(RETENTION_DAYS);
        self.repository.delete_older_than(cutoff).await
    }
}

/// Strips any key whose name suggests it could carry secret material, as a
/// defense-in-depth backstop — event payload structs are not supposed to
/// carry these fields in the first place, but a future event type might add
/// one by accident.
fn redact(mut details: Value) -> Value {
    const SENSITIVE_KEYS: &[&str] = &[
        "password",
        "record",
        "export_key",
        "session_key",
        "secret",
        "drk",
        "private_jwk",
        "identity_u_encrypted",
    ];

    if let Value::Object(ref mut map) = details {
        for key in SENSITIVE_KEYS {
            if map.contains_key(*key) {
                map.insert((*key).to_string(), Value::String("[redacted]".to_string()));
            }
        }
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::LoginFailed;

    #[test]
    fn test_redact_masks_known_sensitive_keys() {
        let value = serde_json::json!({ "password": "hunter2", "ip": "192.0.2.1" });
        let redacted = redact(value);
        assert_eq!(redacted["password"], Value::String("[redacted]".to_string()));
        assert_eq!(redacted["ip"], Value::String("192.0.2.1".to_string()));
    }

    #[test]
    fn test_login_failed_event_type_used_for_audit_entry() {
        let event = LoginFailed {
            actor_class: ActorClass::User,
            ip: Some("192.0.2.1".to_string()),
            user_agent: None,
            occurred_at: Utc::now(),
        };
        assert_eq!(event.event_type(), "auth.login_failed");
        assert_eq!(event.actor_id(), None);
    }
}
