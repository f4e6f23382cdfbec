//! # Session Service
//!
//! Opaque session identifiers, sliding 15-minute TTL, dual cookie/bearer
//! carriage, and CSRF binding (component #6). The `Credential` enum models
//! the dual-carriage design directly: CSRF enforcement is a property of the
//! `Cookie` variant only, never `Bearer`.

use chrono::{Duration as ChronoDuration, Utc};
use shared::{crypto::primitives::random_token, errors::ApiError};
use uuid::Uuid;

use crate::domain::{ActorClass, Session};
use crate::repository::SessionRepository;

const SESSION_TTL_MINUTES: i64 = 15;
const SESSION_ID_BYTES: usize = 32;
const CSRF_TOKEN_BYTES: usize = 32;
const REFRESH_TOKEN_BYTES: usize = 32;

/// How a caller presented their session. Cookie carriage requires a matching
/// CSRF header on every non-GET; bearer carriage is exempt since there is no
/// ambient browser credential to forge.
#[derive(Debug, Clone)]
pub enum Credential {
    Cookie { session_id: String, csrf_token: String },
    Bearer { session_id: String },
}

impl Credential {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Cookie { session_id, .. } | Self::Bearer { session_id } => session_id,
        }
    }
}

#[derive(Clone)]
pub struct SessionService {
    repository: SessionRepository,
}

impl SessionService {
    pub fn new(repository: SessionRepository) -> Self {
        Self { repository }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        email: &str,
        name: &str,
        otp_required: bool,
    ) -> Result<Session, ApiError> {
        let session_id = random_token(SESSION_ID_BYTES);
        let csrf_token = random_token(CSRF_TOKEN_BYTES);
        let refresh_token = random_token(REFRESH_TOKEN_BYTES);
        let expires_at = Utc::now() + ChronoDuration::minutes(SESSION_TTL_MINUTES);

        self.repository
            .create(
                &session_id,
                actor_class,
                principal_id,
                email,
                name,
                &csrf_token,
                &refresh_token,
                otp_required,
                expires_at,
            )
            .await
    }

    /// Resolves a [`Credential`] to its live session, enforcing CSRF for the
    /// `Cookie` variant on every non-GET call.
    pub async fn authenticate(
        &self,
        credential: &Credential,
        is_mutating: bool,
    ) -> Result<Session, ApiError> {
        let session = self
            .repository
            .find(credential.session_id())
            .await?
            .ok_or(ApiError::MissingAuth)?;

        if let Credential::Cookie { csrf_token, .. } = credential {
            if is_mutating
                && !shared::crypto::primitives::constant_time_eq(
                    csrf_token.as_bytes(),
                    session.csrf_token.as_bytes(),
                )
            {
                return Err(ApiError::AccessDenied);
            }
        }

        Ok(session)
    }

    /// Sliding-TTL touch, called on every authenticated request.
    pub async fn touch(&self, session_id: &str) -> Result<(), ApiError> {
        let new_expires_at = Utc::now() + ChronoDuration::minutes(SESSION_TTL_MINUTES);
        self.repository.touch(session_id, new_expires_at).await
    }

    pub async fn set_otp_verified(&self, session_id: &str) -> Result<(), ApiError> {
        self.repository.set_otp_verified(session_id, true).await
    }

    /// Rotates the refresh token for `grant_type=refresh_token`. Returns
    /// `invalid_grant` if the presented token doesn't match the row's current
    /// one — already rotated, or never valid.
    pub async fn refresh(&self, session_id: &str, refresh_token: &str) -> Result<Session, ApiError> {
        let new_refresh_token = random_token(REFRESH_TOKEN_BYTES);
        let new_expires_at = Utc::now() + ChronoDuration::minutes(SESSION_TTL_MINUTES);

        self.repository
            .rotate_refresh_token(session_id, refresh_token, &new_refresh_token, new_expires_at)
            .await?
            .ok_or(ApiError::InvalidGrant)
    }

    /// Same rotation as [`Self::refresh`], keyed by the refresh token alone —
    /// the shape `/token`'s `grant_type=refresh_token` call has, since the
    /// client has no reason to carry the opaque session id separately.
    pub async fn refresh_by_token(&self, refresh_token: &str) -> Result<Session, ApiError> {
        let new_refresh_token = random_token(REFRESH_TOKEN_BYTES);
        let new_expires_at = Utc::now() + ChronoDuration::minutes(SESSION_TTL_MINUTES);

        self.repository
            .rotate_by_refresh_token(refresh_token, &new_refresh_token, new_expires_at)
            .await?
            .ok_or(ApiError::InvalidGrant)
    }

    /// Whether this session still needs a step-up OTP code before it can be
    /// used to complete an OIDC login (§4.7).
    pub fn needs_step_up(session: &Session) -> bool {
        session.otp_required && !session.otp_verified
    }

    pub async fn revoke(&self, session_id: &str) -> Result<(), ApiError> {
        self.repository.delete(session_id).await
    }

    pub async fn revoke_all_for_principal(&self, principal_id: Uuid) -> Result<u64, ApiError> {
        self.repository.delete_all_for_principal(principal_id).await
    }

    pub async fn list_for_principal(&self, principal_id: Uuid) -> Result<Vec<Session>, ApiError> {
        self.repository.list_for_principal(principal_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_session_id_accessor() {
        let cookie = Credential::Cookie {
            session_id: "sid-1".to_string(),
            csrf_token: "csrf-1".to_string(),
        };
        assert_eq!(cookie.session_id(), "sid-1");

        let bearer = Credential::Bearer { session_id: "sid-2".to_string() };
        assert_eq!(bearer.session_id(), "sid-2");
    }
}
