//! # Request Validation Helpers
//!
//! Utilities for validating incoming request data using the `validator` crate.
//!
//! ## How Validation Works
//!
//! ```rust,ignore
//! use validator::Validate;
//!
//! #[derive(Validate)]
//! struct OpaqueLoginStart {
//!     #[validate(custom(function = "validators::not_blank"))]
//!     identifier: String,
//!
//!     #[validate(custom(function = "validators::base64url"))]
//!     credential_request: String,
//! }
//! ```
//!
//! ## Custom Validators
//!
//! | Validator | Purpose |
//! |-----------|---------|
//! | `not_blank` | String is not empty after trimming |
//! | `base64url` | Value is valid unpadded base64url |
//! | `https_uri` | Value parses as an absolute `https://` URI |

use crate::errors::ApiError;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Validates a request DTO that implements `Validate`.
///
/// ## Errors
///
/// Returns `ApiError::ValidationError` with field-level details if
/// validation fails.
pub fn validate_request<T: Validate>(data: &T) -> Result<(), ApiError> {
    data.validate().map_err(ApiError::ValidationError)
}

/// Parses a JSON string and validates it in one step.
///
/// ## Errors
///
/// - `ApiError::BadRequest` if JSON parsing fails
/// - `ApiError::ValidationError` if validation fails
pub fn parse_and_validate<T: DeserializeOwned + Validate>(json: &str) -> Result<T, ApiError> {
    let data: T = serde_json::from_str(json)
        .map_err(|e| ApiError::BadRequest { message: e.to_string() })?;

    validate_request(&data)?;

    Ok(data)
}

/// Custom validation functions for use with `#[validate(custom)]`.
pub mod validators {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use validator::ValidationError;

    /// Validates that a string is not blank (empty or whitespace-only).
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("blank"));
        }
        Ok(())
    }

    /// Validates that a string is unpadded base64url, the wire format used
    /// for OPAQUE messages, wrapped-DRK blobs, and opaque session tokens.
    pub fn base64url(value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::new("empty_base64url"));
        }
        URL_SAFE_NO_PAD
            .decode(value)
            .map(|_| ())
            .map_err(|_| ValidationError::new("invalid_base64url"))
    }

    /// Validates that a string is an absolute `https://` URI, the format
    /// required for redirect URIs and the public origin (loopback `http`
    /// is accepted for local development clients).
    pub fn https_uri(value: &str) -> Result<(), ValidationError> {
        let is_loopback_http = value.starts_with("http://127.0.0.1")
            || value.starts_with("http://localhost");
        if !value.starts_with("https://") && !is_loopback_http {
            return Err(ValidationError::new("not_https_uri"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validators::*;

    #[test]
    fn test_not_blank_valid() {
        assert!(not_blank("hello").is_ok());
        assert!(not_blank("  hello  ").is_ok());
    }

    #[test]
    fn test_not_blank_invalid() {
        assert!(not_blank("").is_err());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("\t\n").is_err());
    }

    #[test]
    fn test_base64url_valid() {
        assert!(base64url("SGVsbG8").is_ok());
        assert!(base64url("QUJD").is_ok());
    }

    #[test]
    fn test_base64url_invalid() {
        assert!(base64url("").is_err());
        assert!(base64url("not base64!").is_err());
        assert!(base64url("has=padding=").is_err());
    }

    #[test]
    fn test_https_uri_valid() {
        assert!(https_uri("https://auth.example.com/callback").is_ok());
        assert!(https_uri("http://localhost:5173/callback").is_ok());
        assert!(https_uri("http://127.0.0.1:5173/callback").is_ok());
    }

    #[test]
    fn test_https_uri_invalid() {
        assert!(https_uri("http://example.com/callback").is_err());
        assert!(https_uri("ftp://example.com").is_err());
    }
}
