//! # Core Domain Entities
//!
//! Maps directly to the logical data model: users, administrators, OPAQUE
//! envelopes and login sessions, OIDC pending-authorization/code rows,
//! sessions, signing keys, zero-knowledge DRK custody rows, RBAC entities,
//! OTP enrollment, audit entries, and settings.
//!
//! Every row type derives `sqlx::FromRow`; rows that cross the HTTP boundary
//! additionally derive `Serialize`. Opaque byte columns (OPAQUE records,
//! wrapped DRK blobs, encrypted private JWKs) are `Vec<u8>` at rest (Postgres
//! `BYTEA`) and never appear in a `Serialize` impl directly — callers
//! base64url-encode them explicitly at the API boundary so it's obvious at
//! the call site that a value is opaque ciphertext, not a plain field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Distinguishes the two actor classes that can hold an OPAQUE envelope, a
/// session, or OTP enrollment. Carried as a Postgres text column (`user` /
/// `admin`) rather than two parallel schemas, since sessions, OPAQUE login
/// rows, and OTP enrollment are otherwise identical in shape across classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorClass {
    User,
    Admin,
}

// =============================================================================
// USER
// =============================================================================

/// An end user. The OPAQUE envelope that actually authenticates this user
/// lives in a separate 1:1 [`UserEnvelope`] row, never inline here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub sub: Uuid,
    /// Stored lowercased; uniqueness is case-insensitive.
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub password_reset_required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public user-directory projection returned by `GET /users` and
/// `GET /users/{sub}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDirectoryEntry {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
}

impl From<User> for UserDirectoryEntry {
    fn from(user: User) -> Self {
        Self {
            sub: user.sub,
            email: user.email,
            name: user.name,
            email_verified: user.email_verified,
        }
    }
}

// =============================================================================
// ADMIN
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Read,
    Write,
}

/// An administrator. `role = write` is required for every mutating admin
/// endpoint; an admin can never delete or disable their own row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Admin {
    pub admin_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// OPAQUE ENVELOPE
// =============================================================================

/// The OPAQUE registration record for one principal. Mutated only by
/// register/finish and password-change/finish, and never read by anything
/// outside the OPAQUE engine.
#[derive(Debug, Clone, FromRow)]
pub struct UserEnvelope {
    pub actor_class: ActorClass,
    pub principal_id: Uuid,
    /// Opaque OPAQUE envelope bytes (the "record" from registration).
    pub record: Vec<u8>,
    /// Email, KEK-encrypted, so the OPAQUE engine can re-derive identityU
    /// without ever storing it in plaintext alongside the envelope.
    pub identity_u_encrypted: Vec<u8>,
    pub identity_s: String,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// OPAQUE LOGIN SESSION
// =============================================================================

/// Server-side OPAQUE login state between `start` and `finish`. TTL ≤ 120s;
/// single-use (deleted by `finish` via compare-and-consume).
#[derive(Debug, Clone, FromRow)]
pub struct OpaqueLoginSession {
    pub session_id: Uuid,
    pub actor_class: ActorClass,
    /// Opaque AKE/OPRF intermediate state produced by `opaque-ke`'s
    /// `ServerLogin::start`.
    pub server_state: Vec<u8>,
    /// KEK-encrypted identityU. `finish` reads identity from here, never
    /// from the client-supplied request body.
    pub identity_u_encrypted: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// PENDING AUTHORIZATION
// =============================================================================

/// In-flight `/authorize` request. Created before authentication completes;
/// `user_sub` is bound during `/authorize/finalize`. TTL ≤ 10 min;
/// consumed (deleted) when exchanged for an authorization code.
#[derive(Debug, Clone, FromRow)]
pub struct PendingAuthorization {
    pub request_id: Uuid,
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    /// Client's ephemeral ECDH-ES P-256 public JWK, serialized JSON, if the
    /// caller opted into zero-knowledge DRK delivery.
    pub zk_pub_jwk: Option<serde_json::Value>,
    pub user_sub: Option<Uuid>,
    pub origin: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// AUTHORIZATION CODE
// =============================================================================

/// Single-use authorization code, TTL ≤ 60s, deleted on use at `/token`. The
/// pending-authorization row that originated this code is consumed (deleted)
/// at finalize time, so every OAuth parameter `/token` still needs — client,
/// redirect, scope, nonce, PKCE challenge — is carried forward here rather
/// than re-read from a row that no longer exists.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorizationCode {
    /// Random 32 bytes, base64url-encoded; this is the literal code value a
    /// client presents at `/token`.
    pub code: String,
    pub request_id: Uuid,
    pub user_sub: Uuid,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Compact JWE the client computed at finalize time, bound here so the
    /// token endpoint can echo it and compute `zk_drk_hash`; `None` when no
    /// `zk_pub` was supplied at `/authorize`.
    pub drk_jwe: Option<String>,
    /// Whether the session that finalized this code had already completed
    /// OTP step-up. Captured at `/authorize/finalize` time since the token
    /// endpoint issues a fresh session that starts unverified regardless of
    /// how the original login session got here.
    pub otp_verified: bool,
}

// =============================================================================
// SESSION
// =============================================================================

/// A logged-in session. The session id itself is the bearer token / cookie
/// value; this row is the only place that id's meaning is defined — it is
/// never a self-contained JWT.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_id: String,
    pub actor_class: ActorClass,
    pub principal_id: Uuid,
    pub email: String,
    pub name: String,
    pub csrf_token: String,
    pub refresh_token: String,
    pub otp_required: bool,
    pub otp_verified: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

// =============================================================================
// SIGNING KEY (JWKS)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SigningKeyState {
    Current,
    Next,
    Retired,
}

/// An EdDSA signing key. Exactly one row has `state = current` at any time;
/// rotation inserts a new `current` row and demotes the old one to
/// `retired` with a grace-window `rotated_at`.
#[derive(Debug, Clone, FromRow)]
pub struct SigningKeyRow {
    pub kid: String,
    pub public_jwk: serde_json::Value,
    /// KEK-sealed private JWK bytes (`nonce || ciphertext || tag`).
    pub private_jwk_encrypted: Vec<u8>,
    pub state: SigningKeyState,
    pub created_at: DateTime<Utc>,
    pub rotated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// ZERO-KNOWLEDGE DRK CUSTODY
// =============================================================================

/// The user's wrapped DRK blob. Server-opaque: stored and returned
/// byte-identical, never decrypted.
#[derive(Debug, Clone, FromRow)]
pub struct WrappedDrk {
    pub user_sub: Uuid,
    pub wrapped_drk_bytes: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

/// The user's published P-256 encryption public JWK, used to address them
/// in zero-knowledge sharing flows.
#[derive(Debug, Clone, FromRow)]
pub struct UserEncPubJwk {
    pub user_sub: Uuid,
    pub jwk: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Optional client-wrapped private encryption JWK, kept for client-side
/// recovery flows. Server-opaque, same as [`WrappedDrk`].
#[derive(Debug, Clone, FromRow)]
pub struct UserEncPrivJwkWrapped {
    pub user_sub: Uuid,
    pub wrapped_jwk_bytes: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// OAUTH CLIENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Public,
    Confidential,
}

/// A registered OIDC relying party. Public clients must use PKCE (S256);
/// confidential clients authenticate with `client_secret_basic`.
#[derive(Debug, Clone, FromRow)]
pub struct Client {
    pub client_id: String,
    pub client_type: ClientType,
    pub name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    /// KEK-sealed client secret; `None` for public clients.
    pub secret_encrypted: Option<Vec<u8>>,
    pub require_pkce: bool,
    pub allowed_scopes: Vec<String>,
}

// =============================================================================
// RBAC
// =============================================================================

/// A grantable permission. Keys are free-form, colon-segmented strings;
/// `darkauth.users:read` is reserved for the user-directory endpoints.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Permission {
    pub key: String,
    pub description: String,
}

/// A group of users. The `default` group is auto-assigned to every new
/// user at registration.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub key: String,
    pub name: String,
    pub enable_login: bool,
    pub require_otp: bool,
}

/// An organization. Exactly one `default` organization exists per
/// installation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub org_id: Uuid,
    pub name: String,
    pub slug: String,
    pub force_otp: bool,
}

/// A role, grantable to organization members. `otp_required` is a reserved
/// system role key.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Role {
    pub role_id: Uuid,
    pub key: String,
    pub name: String,
    pub system: bool,
}

// =============================================================================
// OTP ENROLLMENT
// =============================================================================

/// State machine: absent (no row) → pending (row exists, `verified_at` null)
/// → verified. Disabling OTP deletes the row, returning to absent.
#[derive(Debug, Clone, FromRow)]
pub struct OtpEnrollment {
    pub actor_class: ActorClass,
    pub principal_id: Uuid,
    /// KEK-sealed 20-byte TOTP secret.
    pub secret_encrypted: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    /// SHA-256 hashes of unused backup codes; consumed codes are removed.
    pub backup_codes_hashed: Vec<String>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl OtpEnrollment {
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}

// =============================================================================
// AUDIT ENTRY
// =============================================================================

/// Append-only audit log row. Written in the same logical transaction as
/// the operation it describes wherever the storage layer allows it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub event_type: String,
    pub actor_class: Option<ActorClass>,
    pub actor_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub success: bool,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Free-form JSON context, pre-redacted by the audit service before
    /// this row is ever constructed — passwords, envelope bytes, export
    /// keys, DRK plaintext, and private JWKs must never reach this field.
    pub details: Option<serde_json::Value>,
}

// =============================================================================
// SETTINGS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    String,
    Number,
    Boolean,
    Object,
}

/// A typed, categorized setting. `secure = true` redacts `value` on read
/// unless the caller explicitly requests the raw value (admin-only).
#[derive(Debug, Clone, FromRow)]
pub struct Setting {
    pub key: String,
    pub category: String,
    pub setting_type: SettingType,
    pub value: serde_json::Value,
    pub default_value: serde_json::Value,
    pub secure: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_enrollment_verified_state() {
        let mut enrollment = OtpEnrollment {
            actor_class: ActorClass::User,
            principal_id: Uuid::new_v4(),
            secret_encrypted: vec![1, 2, 3],
            created_at: Utc::now(),
            verified_at: None,
            backup_codes_hashed: vec![],
            last_used_at: None,
        };
        assert!(!enrollment.is_verified());
        enrollment.verified_at = Some(Utc::now());
        assert!(enrollment.is_verified());
    }

    #[test]
    fn test_user_directory_entry_strips_internal_fields() {
        let user = User {
            sub: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
            email_verified: true,
            password_reset_required: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let entry: UserDirectoryEntry = user.clone().into();
        assert_eq!(entry.sub, user.sub);
        assert_eq!(entry.email, user.email);
    }
}
