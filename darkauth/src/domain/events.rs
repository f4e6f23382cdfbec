//! # Domain Events
//!
//! Events feed the audit-log pipeline (component #12 of the system
//! overview): every mutating operation wraps its handler with an audit
//! decorator that emits one of these, which the audit service turns into an
//! [`crate::domain::entities::AuditEntry`] row. There is no message queue in
//! this process — events are consumed in-process by the audit service, but
//! the same `DomainEvent`/`EventEnvelope` shape keeps a path open to an
//! external sink without touching call sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::ActorClass;

/// Common interface for all domain events.
pub trait DomainEvent: Serialize + Send + Sync {
    /// Event type name, used as `AuditEntry::event_type` and for routing.
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;

    /// The principal this event relates to, or `None` for events with no
    /// resolved identity (e.g. a login attempt against an unknown email).
    fn actor_id(&self) -> Option<Uuid>;
}

// =============================================================================
// REGISTRATION / OPAQUE EVENTS
// =============================================================================

/// Emitted when a user completes OPAQUE registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_sub: Uuid,
    pub email: String,
    pub ip: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for UserRegistered {
    fn event_type(&self) -> &'static str {
        "user.registered"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        Some(self.user_sub)
    }
}

/// Emitted when an OPAQUE login finish succeeds and a session is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSucceeded {
    pub actor_class: ActorClass,
    pub principal_id: Uuid,
    pub session_id: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for LoginSucceeded {
    fn event_type(&self) -> &'static str {
        "auth.login_succeeded"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        Some(self.principal_id)
    }
}

/// Emitted on any OPAQUE login failure. Deliberately carries no information
/// that would let an observer distinguish "unknown identity" from "wrong
/// password" — the uniform failure contract in the error-handling design
/// extends to audit entries, not just HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginFailed {
    pub actor_class: ActorClass,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for LoginFailed {
    fn event_type(&self) -> &'static str {
        "auth.login_failed"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        None
    }
}

/// Emitted when login succeeds against an OPAQUE envelope but the
/// principal's effective group/role/org flags forbid it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginNotAllowed {
    pub principal_id: Uuid,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for LoginNotAllowed {
    fn event_type(&self) -> &'static str {
        "auth.login_not_allowed"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        Some(self.principal_id)
    }
}

/// Emitted when a session is revoked, whether by explicit logout or cascade
/// deletion from an admin user-delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRevoked {
    pub principal_id: Uuid,
    pub session_id: String,
    pub reason: SessionRevocationReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRevocationReason {
    Logout,
    RefreshFailure,
    UserDeleted,
}

impl DomainEvent for SessionRevoked {
    fn event_type(&self) -> &'static str {
        "auth.session_revoked"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        Some(self.principal_id)
    }
}

// =============================================================================
// OIDC / AUTHORIZATION EVENTS
// =============================================================================

/// Emitted when an authorization code is exchanged for tokens at `/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIssued {
    pub user_sub: Uuid,
    pub client_id: String,
    pub grant_type: String,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for TokenIssued {
    fn event_type(&self) -> &'static str {
        "oidc.token_issued"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        Some(self.user_sub)
    }
}

/// Emitted on any `/token` or `/authorize` rejection (`invalid_grant`,
/// `invalid_client`, `invalid_request`), so repeated code-reuse or PKCE
/// mismatch attempts are visible in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRejected {
    pub client_id: Option<String>,
    pub error_code: String,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for TokenRejected {
    fn event_type(&self) -> &'static str {
        "oidc.token_rejected"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        None
    }
}

// =============================================================================
// SIGNING-KEY / ADMIN EVENTS
// =============================================================================

/// Emitted when the JWKS lifecycle rotates the current signing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningKeyRotated {
    pub new_kid: String,
    pub retired_kid: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for SigningKeyRotated {
    fn event_type(&self) -> &'static str {
        "jwks.key_rotated"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        None
    }
}

/// Emitted when an admin mutates a user/group/organization/role/permission
/// record, the generic shape the audit decorator falls back to for
/// admin-console CRUD it doesn't have a more specific event for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminResourceMutated {
    pub admin_id: Uuid,
    pub resource_type: String,
    pub resource_id: String,
    pub action: String,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for AdminResourceMutated {
    fn event_type(&self) -> &'static str {
        "admin.resource_mutated"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn actor_id(&self) -> Option<Uuid> {
        Some(self.admin_id)
    }
}

// =============================================================================
// EVENT ENVELOPE
// =============================================================================

/// Wrapper adding delivery metadata (id, schema version, correlation id)
/// around a [`DomainEvent`] payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T: DomainEvent> {
    pub event_id: Uuid,
    pub event_type: String,
    pub version: u32,
    pub correlation_id: Option<String>,
    pub payload: T,
    pub timestamp: DateTime<Utc>,
}

impl<T: DomainEvent> EventEnvelope<T> {
    pub fn new(event: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event.event_type().to_string(),
            version: 1,
            correlation_id: None,
            payload: event,
            timestamp: Utc::now(),
        }
    }

    pub fn with_correlation_id(event: T, correlation_id: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event.event_type().to_string(),
            version: 1,
            correlation_id: Some(correlation_id),
            payload: event,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failed_has_no_actor_id() {
        let event = LoginFailed {
            actor_class: ActorClass::User,
            ip: Some("192.0.2.1".to_string()),
            user_agent: None,
            occurred_at: Utc::now(),
        };
        assert_eq!(event.actor_id(), None);
        assert_eq!(event.event_type(), "auth.login_failed");
    }

    #[test]
    fn test_login_succeeded_carries_principal() {
        let principal_id = Uuid::new_v4();
        let event = LoginSucceeded {
            actor_class: ActorClass::User,
            principal_id,
            session_id: "session-abc".to_string(),
            ip: None,
            user_agent: None,
            occurred_at: Utc::now(),
        };
        assert_eq!(event.actor_id(), Some(principal_id));
    }

    #[test]
    fn test_event_envelope_creation() {
        let event = TokenIssued {
            user_sub: Uuid::new_v4(),
            client_id: "client-1".to_string(),
            grant_type: "authorization_code".to_string(),
            occurred_at: Utc::now(),
        };
        let envelope = EventEnvelope::new(event.clone());
        assert_eq!(envelope.event_type, "oidc.token_issued");
        assert_eq!(envelope.version, 1);
        assert!(envelope.correlation_id.is_none());
        assert_eq!(envelope.payload.user_sub, event.user_sub);
    }
}
