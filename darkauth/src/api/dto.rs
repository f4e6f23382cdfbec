//! # Data Transfer Objects
//!
//! Request/response shapes for both HTTP surfaces. Request DTOs derive
//! [`validator::Validate`]; OPAQUE/DRK/JWK byte payloads travel as
//! base64url strings validated with `shared::validation::validators::base64url`
//! rather than raw bytes, since JSON has no byte-string type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use shared::validation::validators;

// =============================================================================
// DISCOVERY / JWKS
// =============================================================================

/// `GET /.well-known/openid-configuration` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct OpenIdConfigurationDto {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub end_session_endpoint: String,
    pub userinfo_endpoint: String,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
}

// =============================================================================
// AUTHORIZE
// =============================================================================

/// Query parameters for `GET /authorize`.
#[derive(Debug, Deserialize, Validate)]
pub struct AuthorizeQuery {
    #[validate(custom(function = "validators::not_blank"))]
    pub client_id: String,
    #[validate(custom(function = "validators::not_blank"))]
    pub redirect_uri: String,
    #[validate(custom(function = "validators::not_blank"))]
    pub response_type: String,
    #[validate(custom(function = "validators::not_blank"))]
    pub scope: String,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    /// JSON-encoded P-256 ECDH-ES public JWK, present only when the client
    /// opts into zero-knowledge DRK delivery.
    pub zk_pub: Option<String>,
}

/// `GET /authorize` response carrying the pending request id a client
/// carries forward to `/authorize/finalize`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAuthorizationDto {
    pub request_id: Uuid,
}

/// `POST /authorize/finalize` request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FinalizeAuthorizeRequest {
    pub request_id: Uuid,
    pub drk_jwe: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeAuthorizeResponse {
    pub code: String,
    pub state: Option<String>,
    pub drk_jwe: Option<String>,
}

// =============================================================================
// TOKEN
// =============================================================================

/// `POST /token` form body. OAuth's standard form-encoded content type,
/// discriminated on `grant_type` rather than split across endpoints.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponseDto {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

impl From<crate::service::authorization_service::TokenResult> for TokenResponseDto {
    fn from(result: crate::service::authorization_service::TokenResult) -> Self {
        Self {
            access_token: result.access_token,
            refresh_token: result.refresh_token,
            id_token: result.id_token,
            token_type: result.token_type.to_string(),
            expires_in: result.expires_in,
            scope: result.scope,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIntrospectionDto {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub otp_required: bool,
    pub otp_verified: bool,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

// =============================================================================
// OPAQUE
// =============================================================================

/// `POST /opaque/register/start` request. `request` is the client's OPAQUE
/// registration-request message, base64url-encoded.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OpaqueRegisterStartRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "validators::base64url"))]
    pub request: String,
}

#[derive(Debug, Serialize)]
pub struct OpaqueRegisterStartResponse {
    pub response: String,
}

/// `POST /opaque/register/finish` request.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OpaqueRegisterFinishRequest {
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validators::base64url"))]
    pub record: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// `POST /opaque/login/start` request. `email` only locates the registered
/// envelope; the engine binds the authoritative identity into the
/// server-side login-session row, never into this request body (§4.1).
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OpaqueLoginStartRequest {
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validators::base64url"))]
    pub request: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueLoginStartResponse {
    pub session_id: Uuid,
    pub message: String,
}

/// `POST /opaque/login/finish` request. Deliberately has no `email` field —
/// there is nothing for one to do here since identity is bound server-side.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OpaqueLoginFinishRequest {
    pub session_id: Uuid,
    #[validate(custom(function = "validators::base64url"))]
    pub finish: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueLoginFinishResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub sub: Uuid,
    pub user: UserProfileDto,
    pub otp_required: bool,
    /// Exported once, at login-finish time, so the client can derive and
    /// re-wrap the DRK immediately. Never persisted server-side (§4.5).
    pub session_key: String,
}

/// `POST /admin/opaque/login/finish` response. The admin console has no OIDC
/// pipeline of its own — a bound session is the whole story, so this carries
/// no `idToken`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginFinishResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub admin: AdminDto,
    pub otp_required: bool,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDto {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
}

impl From<crate::domain::User> for UserProfileDto {
    fn from(user: crate::domain::User) -> Self {
        Self {
            sub: user.sub,
            email: user.email,
            name: user.name,
            email_verified: user.email_verified,
        }
    }
}

// =============================================================================
// ZK DRK CUSTODY
// =============================================================================

/// `PUT /crypto/wrapped-drk` and the enc-priv-jwk analog. The server stores
/// `wrapped` byte-identical and never decodes it beyond the base64url
/// transport encoding.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct WrappedBlobRequest {
    #[validate(custom(function = "validators::base64url"))]
    pub wrapped: String,
}

#[derive(Debug, Serialize)]
pub struct WrappedBlobResponse {
    pub wrapped: String,
}

/// `PUT /crypto/user-enc-pub` request body: a raw P-256 JWK, opaque to the
/// server beyond its existence.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserEncPubJwkRequest {
    pub jwk: Value,
}

#[derive(Debug, Serialize)]
pub struct UserEncPubJwkResponse {
    pub jwk: Value,
}

// =============================================================================
// USER DIRECTORY
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDirectoryResponse {
    pub users: Vec<crate::domain::UserDirectoryEntry>,
}

// =============================================================================
// OTP
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSetupInitResponse {
    pub secret: String,
    pub provisioning_uri: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OtpCodeRequest {
    #[validate(length(min = 6, max = 11))]
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSetupVerifyResponse {
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpStatusResponse {
    pub enrolled: bool,
    pub verified: bool,
}

// =============================================================================
// ADMIN: SESSIONS
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummaryDto {
    pub session_id: String,
    pub principal_id: Uuid,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub last_seen: chrono::DateTime<chrono::Utc>,
}

impl From<crate::domain::Session> for SessionSummaryDto {
    fn from(session: crate::domain::Session) -> Self {
        Self {
            session_id: session.session_id,
            principal_id: session.principal_id,
            email: session.email,
            created_at: session.created_at,
            expires_at: session.expires_at,
            last_seen: session.last_seen,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummaryDto>,
}

// =============================================================================
// ADMIN: GROUPS / ORGANIZATIONS / ROLES / PERMISSIONS
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    #[validate(custom(function = "validators::not_blank"))]
    pub key: String,
    #[validate(custom(function = "validators::not_blank"))]
    pub name: String,
    #[serde(default)]
    pub enable_login: bool,
    #[serde(default)]
    pub require_otp: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SetGroupFlagsRequest {
    pub enable_login: bool,
    pub require_otp: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AddUserToGroupRequest {
    pub user_sub: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateOrganizationRequest {
    #[validate(custom(function = "validators::not_blank"))]
    pub name: String,
    #[validate(custom(function = "validators::not_blank"))]
    pub slug: String,
    #[serde(default)]
    pub force_otp: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateRoleRequest {
    #[validate(custom(function = "validators::not_blank"))]
    pub key: String,
    #[validate(custom(function = "validators::not_blank"))]
    pub name: String,
    #[serde(default)]
    pub system: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreatePermissionRequest {
    #[validate(custom(function = "validators::not_blank"))]
    pub key: String,
    #[validate(custom(function = "validators::not_blank"))]
    pub description: String,
}

// =============================================================================
// ADMIN: CLIENTS
// =============================================================================

/// `POST /admin/clients` request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateClientRequest {
    #[validate(custom(function = "validators::not_blank"))]
    pub client_id: String,
    pub client_type: crate::domain::ClientType,
    #[validate(custom(function = "validators::not_blank"))]
    pub name: String,
    #[validate(length(min = 1))]
    pub redirect_uris: Vec<String>,
    #[validate(length(min = 1))]
    pub grant_types: Vec<String>,
    #[validate(length(min = 1))]
    pub allowed_scopes: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDto {
    pub client_id: String,
    pub client_type: crate::domain::ClientType,
    pub name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub require_pkce: bool,
    pub allowed_scopes: Vec<String>,
    /// Present only in the response to the creating request, and only for
    /// confidential clients — the plaintext secret is never retrievable
    /// again afterward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl From<crate::domain::Client> for ClientDto {
    fn from(client: crate::domain::Client) -> Self {
        Self {
            client_id: client.client_id,
            client_type: client.client_type,
            name: client.name,
            redirect_uris: client.redirect_uris,
            grant_types: client.grant_types,
            token_endpoint_auth_method: client.token_endpoint_auth_method,
            require_pkce: client.require_pkce,
            allowed_scopes: client.allowed_scopes,
            client_secret: None,
        }
    }
}

// =============================================================================
// ADMIN: SETTINGS
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SetSettingValueRequest {
    pub value: Value,
}

// =============================================================================
// ADMIN: KEYS
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateKeyResponse {
    pub new_kid: String,
}

// =============================================================================
// ADMIN: AUDIT
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub event_type: Option<String>,
    pub actor_id: Option<Uuid>,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub entries: Vec<crate::domain::AuditEntry>,
}

// =============================================================================
// ADMIN: ADMIN-USERS
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateAdminRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub role: crate::domain::AdminRole,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateAdminRoleRequest {
    pub role: crate::domain::AdminRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDto {
    pub admin_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: crate::domain::AdminRole,
}

impl From<crate::domain::Admin> for AdminDto {
    fn from(admin: crate::domain::Admin) -> Self {
        Self { admin_id: admin.admin_id, email: admin.email, name: admin.name, role: admin.role }
    }
}

// =============================================================================
// INSTALL
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct InstallTokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InstallOpaqueStartRequest {
    pub token: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "validators::base64url"))]
    pub request: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InstallOpaqueFinishRequest {
    pub token: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validators::base64url"))]
    pub record: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InstallCompleteRequest {
    pub token: String,
    #[validate(email)]
    pub email: String,
}

// =============================================================================
// HEALTH
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_register_start_rejects_non_base64url_request() {
        let dto = OpaqueRegisterStartRequest {
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            request: "not base64!".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_opaque_register_start_accepts_valid_fields() {
        let dto = OpaqueRegisterStartRequest {
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            request: "QUJDRA".to_string(),
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_client_requires_nonempty_collections() {
        let mut dto = CreateClientRequest {
            client_id: "app".to_string(),
            client_type: crate::domain::ClientType::Public,
            name: "App".to_string(),
            redirect_uris: vec![],
            grant_types: vec!["authorization_code".to_string()],
            allowed_scopes: vec!["openid".to_string()],
        };
        assert!(dto.validate().is_err());
        dto.redirect_uris = vec!["https://app.example.com/callback".to_string()];
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_user_profile_dto_from_user() {
        let user = crate::domain::User {
            sub: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            email_verified: true,
            password_reset_required: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let dto: UserProfileDto = user.clone().into();
        assert_eq!(dto.sub, user.sub);
        assert_eq!(dto.email, user.email);
    }
}
