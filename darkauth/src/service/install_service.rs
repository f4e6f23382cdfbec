//! # Installation Bootstrap Service
//!
//! Orchestrates component #13 (§4.10): the one-shot install-token flow that
//! takes a fresh, empty database to a usable installation — registering the
//! bootstrap administrator over OPAQUE, provisioning the default
//! organization/group/role, minting the first signing key, and flipping
//! `installed = true`.

use shared::{crypto::primitives::sha256_b64url, errors::ApiError};

use crate::domain::{ActorClass, AdminRole};
use crate::repository::{AdminRepository, InstallRepository};
use crate::service::jwks_service::JwksService;
use crate::service::opaque_service::OpaqueService;
use crate::service::rbac_service::RbacService;

const DEFAULT_ORGANIZATION_NAME: &str = "Default";
const DEFAULT_ORGANIZATION_SLUG: &str = "default";
const DEFAULT_GROUP_KEY: &str = "default";
const DEFAULT_GROUP_NAME: &str = "Default";
const OTP_REQUIRED_ROLE_KEY: &str = "otp_required";
const OTP_REQUIRED_ROLE_NAME: &str = "OTP Required";

#[derive(Clone)]
pub struct InstallService {
    repository: InstallRepository,
    opaque: OpaqueService,
    jwks: JwksService,
    rbac: RbacService,
    admins: AdminRepository,
    issuer: String,
}

impl InstallService {
    pub fn new(
        repository: InstallRepository,
        opaque: OpaqueService,
        jwks: JwksService,
        rbac: RbacService,
        admins: AdminRepository,
        issuer: String,
    ) -> Self {
        Self { repository, opaque, jwks, rbac, admins, issuer }
    }

    /// Seeds the single-use install token from the configured value at first
    /// boot. A no-op once the installation is complete — callers still run
    /// this unconditionally at startup, since `seed_token` only ever
    /// overwrites an unconsumed token.
    pub async fn seed_token(&self, token: &str) -> Result<(), ApiError> {
        self.repository.seed_token(&token_hash(token)).await
    }

    pub async fn is_installed(&self) -> Result<bool, ApiError> {
        self.repository.is_installed().await
    }

    /// Validates an install token for `GET /api/install`, without consuming
    /// it — consumption only happens at [`Self::complete`].
    pub async fn validate_token(&self, token: &str) -> Result<(), ApiError> {
        if self.repository.is_installed().await? {
            return Err(ApiError::Conflict { resource: "installation".to_string() });
        }
        if !self.repository.token_is_valid(&token_hash(token)).await? {
            return Err(ApiError::InvalidRequest {
                message: "install token is invalid or already consumed".to_string(),
            });
        }
        Ok(())
    }

    /// `POST /api/install/opaque/start`. Creates the bootstrap admin row on
    /// first call for a given email (idempotent on retry — a second start
    /// before finish reuses the same row) and runs the OPAQUE registration
    /// start against its id.
    pub async fn opaque_register_start(
        &self,
        token: &str,
        email: &str,
        name: &str,
        request_bytes: &[u8],
    ) -> Result<Vec<u8>, ApiError> {
        self.validate_token(token).await?;

        let admin = match self.admins.find_by_email(email).await? {
            Some(admin) => admin,
            None => self.admins.create(email, name, AdminRole::Write).await?,
        };

        self.opaque.registration_start(request_bytes, admin.admin_id)
    }

    /// `POST /api/install/opaque/finish`. Persists the uploaded OPAQUE
    /// envelope against the admin row `start` created.
    pub async fn opaque_register_finish(
        &self,
        token: &str,
        email: &str,
        record_bytes: &[u8],
    ) -> Result<(), ApiError> {
        self.validate_token(token).await?;

        let admin = self
            .admins
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::BadRequest { message: "call opaque/start before opaque/finish".to_string() })?;

        self.opaque
            .registration_finish(ActorClass::Admin, admin.admin_id, record_bytes, email, &self.issuer)
            .await
    }

    /// `POST /api/install/complete`. Consumes the install token, provisions
    /// the default organization/group/role, and mints the installation's
    /// first signing key. A second call with an already-consumed token is a
    /// no-op (§8: "a retried /install/complete call is not a second
    /// bootstrap").
    pub async fn complete(&self, token: &str, email: &str) -> Result<(), ApiError> {
        self.admins
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::BadRequest { message: "no bootstrap admin registered for this email".to_string() })?;

        let consumed = self.repository.complete_install(&token_hash(token)).await?;
        if !consumed {
            return Ok(());
        }

        self.rbac
            .create_organization(DEFAULT_ORGANIZATION_NAME, DEFAULT_ORGANIZATION_SLUG, false)
            .await?;
        self.rbac
            .create_group(DEFAULT_GROUP_KEY, DEFAULT_GROUP_NAME, true, false)
            .await?;
        self.rbac.create_role(OTP_REQUIRED_ROLE_KEY, OTP_REQUIRED_ROLE_NAME, true).await?;
        self.jwks.ensure_current_key().await?;

        Ok(())
    }
}

fn token_hash(token: &str) -> String {
    sha256_b64url(token.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hash_is_deterministic_and_injective_in_practice() {
        assert_eq!(token_hash("test-install-token"), token_hash("test-install-token"));
        assert_ne!(token_hash("test-install-token"), token_hash("other-token"));
    }
}
