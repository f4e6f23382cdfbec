//! # Application Error Types
//!
//! Unified error handling with automatic HTTP conversion.
//!
//! ## Design Philosophy
//!
//! This module follows the "make illegal states unrepresentable" principle.
//! Each error variant maps to a specific HTTP status code and error code,
//! ensuring consistent API responses across every endpoint on both the
//! user-facing and admin HTTP surfaces.
//!
//! ## Error Categories
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ApiError Categories                             │
//! ├─────────────────────────┬───────────────────┬────────────────────────────┤
//! │ Authentication (401)    │ Authorization(403)│ Validation (400)           │
//! ├─────────────────────────┼───────────────────┼────────────────────────────┤
//! │ InvalidCredentials      │ InsufficientPerms │ ValidationError            │
//! │ TokenExpired            │ AccessDenied      │ BadRequest                 │
//! │ InvalidToken            │ UserLoginNotAllowed│ InvalidUuid               │
//! │ MissingAuth             │ EmailUnverified   │ InvalidRequest             │
//! ├─────────────────────────┴───────────────────┴────────────────────────────┤
//! │ Resources (404, 409)    │ Rate Limit (429)  │ Server (500, 503)          │
//! ├─────────────────────────┼───────────────────┼────────────────────────────┤
//! │ NotFound                │ RateLimited       │ DatabaseError              │
//! │ Conflict                │                   │ InternalError              │
//! ├─────────────────────────┼───────────────────┤ ServiceUnavailable         │
//! │ OAuth (400)             │                   │                            │
//! │ InvalidGrant            │                   │                            │
//! │ InvalidClient           │                   │                            │
//! └─────────────────────────┴───────────────────┴────────────────────────────┘
//! ```
//!
//! ## HTTP Response Format
//!
//! All errors are serialized to a consistent JSON format:
//!
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Validation error",
//!   "request_id": "550e8400-e29b-41d4-a716-446655440000",
//!   "details": { ... },
//!   "timestamp": "2024-01-15T10:30:00Z"
//! }
//! ```
//!
//! ## Framework Integration
//!
//! - **Actix-web**: `impl ResponseError for ApiError`

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Main Error Enum
// =============================================================================

/// Application error type with automatic HTTP status mapping.
///
/// ## Adding New Variants
///
/// 1. Choose the appropriate HTTP status code
/// 2. Add the variant with `#[error("...")]` for message format
/// 3. Update `error_code()`, `status_code()`, `is_server_error()`
/// 4. Add tests
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Authentication Errors (401 Unauthorized)
    // =========================================================================

    /// OPAQUE login failed. Deliberately identical message/timing for every
    /// failure cause (unknown user, wrong password) so a client cannot
    /// distinguish them.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Access token (or session) has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is malformed, has an invalid signature, or was tampered with.
    #[error("Invalid token")]
    InvalidToken,

    /// Request is missing a required session credential.
    #[error("Missing authentication")]
    MissingAuth,

    /// Account temporarily locked due to too many failed login attempts.
    #[error("Account locked")]
    AccountLocked {
        until: chrono::DateTime<chrono::Utc>,
    },

    // =========================================================================
    // Authorization Errors (403 Forbidden)
    // =========================================================================

    /// Caller's resolved permission set doesn't allow this action.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// Caller can't access this specific resource.
    #[error("Resource access denied")]
    AccessDenied,

    /// Effective `otpRequired` is true but no TOTP/backup code was presented,
    /// or the user is otherwise barred from completing login.
    #[error("User is not permitted to complete login")]
    UserLoginNotAllowed,

    /// Email verification is required before this action is permitted.
    #[error("Email address is not verified")]
    EmailUnverified,

    // =========================================================================
    // Validation Errors (400 Bad Request)
    // =========================================================================

    /// Request body failed `validator`-derived field rules.
    #[error("Validation error")]
    ValidationError(#[from] ValidationErrors),

    /// Generic bad request with a custom message.
    #[error("Invalid input: {message}")]
    BadRequest { message: String },

    /// UUID parsing failed.
    #[error("Invalid UUID format")]
    InvalidUuid,

    // =========================================================================
    // OAuth / OIDC Errors (400 Bad Request, RFC 6749 §5.2 flavored)
    // =========================================================================

    /// Authorization grant (code, refresh token) is invalid, expired,
    /// revoked, or doesn't match the presenting client.
    #[error("Invalid grant")]
    InvalidGrant,

    /// Client authentication failed or the client is unknown.
    #[error("Invalid client")]
    InvalidClient,

    /// Request is missing a required parameter, has an invalid parameter
    /// value, or is otherwise malformed per OAuth's own error taxonomy
    /// (distinct from field-level `ValidationError` on JSON bodies).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    // =========================================================================
    // Resource Errors (404 Not Found, 409 Conflict)
    // =========================================================================

    /// Requested resource doesn't exist.
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Action would create a duplicate or violate a uniqueness constraint.
    #[error("Resource already exists: {resource}")]
    Conflict { resource: String },

    // =========================================================================
    // Rate Limiting (429 Too Many Requests)
    // =========================================================================

    /// Token bucket for this (endpoint class, key) pair is exhausted.
    #[error("Too many requests")]
    RateLimited { retry_after_seconds: u64 },

    // =========================================================================
    // Server Errors (500 Internal Server Error, 503 Service Unavailable)
    // =========================================================================

    /// PostgreSQL query failed. Details logged, generic message returned.
    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    /// Unspecified internal error; last resort when no specific variant
    /// applies.
    #[error("Internal server error")]
    InternalError { message: String },

    /// A dependency this process requires (KEK, signing key material) is
    /// not currently available.
    #[error("Service unavailable")]
    ServiceUnavailable { service: String },
}

// =============================================================================
// Error Methods
// =============================================================================

impl ApiError {
    /// Returns a stable, machine-readable error code in `SCREAMING_SNAKE_CASE`.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::MissingAuth => "MISSING_AUTH",
            Self::AccountLocked { .. } => "ACCOUNT_LOCKED",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::UserLoginNotAllowed => "USER_LOGIN_NOT_ALLOWED",
            Self::EmailUnverified => "EMAIL_UNVERIFIED",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::InvalidUuid => "INVALID_UUID",
            Self::InvalidGrant => "INVALID_GRANT",
            Self::InvalidClient => "INVALID_CLIENT",
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError { .. } => "INTERNAL_ERROR",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    /// Returns the HTTP status code for this error. Source of truth for the
    /// error-to-status mapping; `ResponseError::status_code` delegates here.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::TokenExpired
            | Self::InvalidToken
            | Self::MissingAuth
            | Self::AccountLocked { .. } => StatusCode::UNAUTHORIZED,

            Self::InsufficientPermissions
            | Self::AccessDenied
            | Self::UserLoginNotAllowed
            | Self::EmailUnverified => StatusCode::FORBIDDEN,

            Self::ValidationError(_)
            | Self::BadRequest { .. }
            | Self::InvalidUuid
            | Self::InvalidGrant
            | Self::InvalidClient
            | Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,

            Self::NotFound { .. } => StatusCode::NOT_FOUND,

            Self::Conflict { .. } => StatusCode::CONFLICT,

            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            Self::DatabaseError(_) | Self::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns `true` for 5xx errors. These are logged at ERROR level and
    /// never expose their cause to the client; 4xx errors log at WARN.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::InternalError { .. } | Self::ServiceUnavailable { .. }
        )
    }
}

// =============================================================================
// Response Structure
// =============================================================================

/// Standard error response body. All API errors serialize to this shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorResponse {
    /// Builds a response from an `ApiError`, attaching type-specific details
    /// (validation field errors, retry delay, lock expiry) while never
    /// surfacing server-error internals to the client.
    pub fn new(error: &ApiError) -> Self {
        let details = match error {
            ApiError::ValidationError(errors) => {
                Some(serde_json::to_value(errors).unwrap_or_default())
            }
            ApiError::RateLimited { retry_after_seconds } => {
                Some(serde_json::json!({ "retry_after_seconds": retry_after_seconds }))
            }
            ApiError::AccountLocked { until } => {
                Some(serde_json::json!({ "locked_until": until }))
            }
            ApiError::DatabaseError(_) | ApiError::InternalError { .. } => None,
            _ => None,
        };

        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            request_id: None,
            details,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

// =============================================================================
// Actix-web Integration
// =============================================================================

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let response = ErrorResponse::new(self);
        HttpResponse::build(self.status_code()).json(response)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_errors_return_401() {
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MissingAuth.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_authorization_errors_return_403() {
        assert_eq!(ApiError::InsufficientPermissions.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::AccessDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::UserLoginNotAllowed.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::EmailUnverified.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_oauth_errors_return_400() {
        assert_eq!(ApiError::InvalidGrant.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidClient.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidRequest { message: "x".into() }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_resource_errors() {
        assert_eq!(
            ApiError::NotFound { resource: "user".to_string() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict { resource: "email".to_string() }.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_rate_limited_returns_429() {
        assert_eq!(
            ApiError::RateLimited { retry_after_seconds: 30 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_error_codes_are_screaming_snake_case() {
        assert_eq!(ApiError::InvalidCredentials.error_code(), "INVALID_CREDENTIALS");
        assert_eq!(ApiError::NotFound { resource: "test".to_string() }.error_code(), "NOT_FOUND");
        assert_eq!(ApiError::RateLimited { retry_after_seconds: 60 }.error_code(), "RATE_LIMITED");
        assert_eq!(ApiError::UserLoginNotAllowed.error_code(), "USER_LOGIN_NOT_ALLOWED");
    }

    #[test]
    fn test_server_errors_are_flagged() {
        assert!(ApiError::InternalError { message: "test".to_string() }.is_server_error());
        assert!(ApiError::ServiceUnavailable { service: "test".to_string() }.is_server_error());
        assert!(!ApiError::InvalidCredentials.is_server_error());
        assert!(!ApiError::NotFound { resource: "test".to_string() }.is_server_error());
    }

    #[test]
    fn test_error_response_includes_timestamp() {
        let error = ApiError::InvalidCredentials;
        let response = ErrorResponse::new(&error);
        let now = chrono::Utc::now();
        let diff = now - response.timestamp;
        assert!(diff.num_seconds() < 60);
    }

    #[test]
    fn test_error_response_with_request_id() {
        let error = ApiError::InvalidCredentials;
        let request_id = Uuid::new_v4();
        let response = ErrorResponse::new(&error).with_request_id(request_id);
        assert_eq!(response.request_id, Some(request_id.to_string()));
    }

    #[test]
    fn test_server_errors_omit_details() {
        let error = ApiError::InternalError { message: "secret cause".to_string() };
        let response = ErrorResponse::new(&error);
        assert!(response.details.is_none());
    }
}
