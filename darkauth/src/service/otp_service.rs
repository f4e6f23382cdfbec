//! # OTP Service
//!
//! TOTP enrollment, verification, and backup codes (component #8). The
//! enrollment-state machine itself lives in the repository layer (row
//! presence/absence); this service owns the crypto and the policy decision
//! of whether a login requires step-up at all.

use chrono::Utc;
use shared::{
    crypto::{kek::Kek, primitives::random_bytes, totp},
    errors::ApiError,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::ActorClass;
use crate::repository::{OtpRepository, RbacRepository, SettingsRepository};

const TOTP_SECRET_BYTES: usize = 20;
const BACKUP_CODE_COUNT: usize = 10;
const BACKUP_CODE_BYTES: usize = 5;

pub struct SetupInit {
    pub secret_base32: String,
    pub provisioning_uri: String,
}

pub struct SetupVerifyResult {
    pub backup_codes: Vec<String>,
}

#[derive(Clone)]
pub struct OtpService {
    repository: OtpRepository,
    rbac: RbacRepository,
    settings: SettingsRepository,
    kek: Arc<Kek>,
}

impl OtpService {
    pub fn new(
        repository: OtpRepository,
        rbac: RbacRepository,
        settings: SettingsRepository,
        kek: Arc<Kek>,
    ) -> Self {
        Self { repository, rbac, settings, kek }
    }

    /// Effective `otpRequired` per §4.7: the OR of the global setting, the
    /// user's organizations' `forceOtp`, any assigned `otp_required` role,
    /// and any group with `requireOtp=true`. Admins have no organization
    /// membership, so only the global setting and their groups apply to them
    /// in practice, but the resolution is identical either way.
    pub async fn resolve_otp_required(&self, actor_class: ActorClass, principal_id: Uuid) -> Result<bool, ApiError> {
        if actor_class == ActorClass::User {
            let global_setting = self.settings.find("otp.require_for_users").await?;
            let global_required = global_setting
                .map(|s| s.value.as_bool().unwrap_or(false))
                .unwrap_or(false);
            if global_required {
                return Ok(true);
            }

            let organizations = self.rbac.organizations_for_user(principal_id).await?;
            if organizations.iter().any(|org| org.force_otp) {
                return Ok(true);
            }

            let roles = self.rbac.role_keys(principal_id).await?;
            if roles.iter().any(|key| key == "otp_required") {
                return Ok(true);
            }

            let groups = self.rbac.groups_for_user(principal_id).await?;
            if groups.iter().any(|g| g.require_otp) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Checks the login-gating flag: a user whose every group disables login
    /// is barred even with correct credentials. A user in no groups at all
    /// is not gated by this check (there is nothing disabling them).
    pub async fn is_login_allowed(&self, principal_id: Uuid) -> Result<bool, ApiError> {
        let groups = self.rbac.groups_for_user(principal_id).await?;
        if groups.is_empty() {
            return Ok(true);
        }
        Ok(groups.iter().any(|g| g.enable_login))
    }

    /// Starts or restarts enrollment. Generates a fresh secret, KEK-seals it,
    /// and returns the provisioning URI for a client authenticator app.
    pub async fn setup_init(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        account_label: &str,
        issuer: &str,
    ) -> Result<SetupInit, ApiError> {
        let secret = random_bytes(TOTP_SECRET_BYTES);
        let secret_encrypted = self
            .kek
            .seal(&secret)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        self.repository
            .create_pending(actor_class, principal_id, &secret_encrypted)
            .await?;

        let secret_base32 = base32_encode(&secret);
        let provisioning_uri = format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits=6&period=30",
            urlencode(issuer),
            urlencode(account_label),
            secret_base32,
            urlencode(issuer),
        );

        Ok(SetupInit { secret_base32, provisioning_uri })
    }

    /// Verifies the first code and, on success, marks the enrollment
    /// verified and generates the one-time backup codes.
    pub async fn setup_verify(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        code: &str,
    ) -> Result<SetupVerifyResult, ApiError> {
        let enrollment = self
            .repository
            .find(actor_class, principal_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest { message: "no pending OTP enrollment".to_string() })?;

        let secret = self
            .kek
            .unseal(&enrollment.secret_encrypted)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        if !totp::verify_totp(&secret, code, Utc::now().timestamp() as u64) {
            return Err(ApiError::InvalidCredentials);
        }

        let mut backup_codes = Vec::with_capacity(BACKUP_CODE_COUNT);
        let mut backup_codes_hashed = Vec::with_capacity(BACKUP_CODE_COUNT);
        for _ in 0..BACKUP_CODE_COUNT {
            let code = format_backup_code(&random_bytes(BACKUP_CODE_BYTES));
            backup_codes_hashed.push(hex::encode(shared::crypto::primitives::sha256(code.as_bytes())));
            backup_codes.push(code);
        }

        self.repository
            .verify(actor_class, principal_id, &backup_codes_hashed)
            .await?;

        Ok(SetupVerifyResult { backup_codes })
    }

    /// Verifies a step-up code: a TOTP code, or a backup code if the TOTP
    /// check fails. Backup codes are single-use, consumed atomically.
    pub async fn verify(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        code: &str,
    ) -> Result<(), ApiError> {
        let enrollment = self
            .repository
            .find(actor_class, principal_id)
            .await?
            .filter(|e| e.is_verified())
            .ok_or(ApiError::UserLoginNotAllowed)?;

        let secret = self
            .kek
            .unseal(&enrollment.secret_encrypted)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        if totp::verify_totp(&secret, code, Utc::now().timestamp() as u64) {
            self.repository.record_use(actor_class, principal_id, Utc::now()).await?;
            return Ok(());
        }

        let code_hash = hex::encode(shared::crypto::primitives::sha256(code.as_bytes()));
        let consumed = self
            .repository
            .consume_backup_code(actor_class, principal_id, &code_hash)
            .await?;

        if consumed.is_some() {
            Ok(())
        } else {
            Err(ApiError::InvalidCredentials)
        }
    }

    pub async fn disable(&self, actor_class: ActorClass, principal_id: Uuid) -> Result<(), ApiError> {
        self.repository.delete(actor_class, principal_id).await
    }

    pub async fn status(&self, actor_class: ActorClass, principal_id: Uuid) -> Result<bool, ApiError> {
        Ok(self
            .repository
            .find(actor_class, principal_id)
            .await?
            .map(|e| e.is_verified())
            .unwrap_or(false))
    }

    /// Full enrollment state as `(enrolled, verified)` — [`Self::status`]
    /// collapses "never enrolled" and "enrolled but not yet verified" to the
    /// same `false`, which `GET /otp/status` needs to tell apart.
    pub async fn enrollment_state(&self, actor_class: ActorClass, principal_id: Uuid) -> Result<(bool, bool), ApiError> {
        Ok(self
            .repository
            .find(actor_class, principal_id)
            .await?
            .map(|e| (true, e.is_verified()))
            .unwrap_or((false, false)))
    }
}

/// RFC 4648 base32 without padding, the encoding authenticator apps expect
/// for a `secret=` parameter.
fn base32_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
    let mut output = String::new();
    let mut buffer: u32 = 0;
    let mut bits_in_buffer = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u32;
        bits_in_buffer += 8;
        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            output.push(ALPHABET[((buffer >> bits_in_buffer) & 0x1f) as usize] as char);
        }
    }
    if bits_in_buffer > 0 {
        output.push(ALPHABET[((buffer << (5 - bits_in_buffer)) & 0x1f) as usize] as char);
    }
    output
}

fn format_backup_code(bytes: &[u8]) -> String {
    let digits: String = bytes.iter().map(|b| (b % 10).to_string()).collect();
    format!("{}-{}", &digits[..5], &digits[5..])
}

fn urlencode(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_string() } else { format!("%{:02X}", c as u32) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base32_encode_known_vector() {
        assert_eq!(base32_encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn test_backup_code_has_dash_grouping() {
        let code = format_backup_code(&[1, 2, 3, 4, 5]);
        assert_eq!(code.len(), 11);
        assert_eq!(code.chars().nth(5), Some('-'));
    }

    #[test]
    fn test_urlencode_escapes_reserved_characters() {
        assert_eq!(urlencode("Dark Auth"), "Dark%20Auth");
        assert_eq!(urlencode("alice"), "alice");
    }
}
