//! # OPAQUE Engine
//!
//! Server side of the aPAKE (component #3). Registration persists an
//! envelope the server can never invert to a password; login runs the
//! OPRF/AKE exchange and returns a session key the server also never learns
//! (nor needs — session issuance only needs the fact the AKE succeeded).
//!
//! `ServerSetup` holds this installation's long-term OPRF/AKE key material.
//! It is generated once at first boot and persisted KEK-sealed under the
//! `opaque.server_setup` settings key — losing it invalidates every
//! registered envelope, so it is never regenerated once it exists.

use opaque_ke::{
    ciphersuite::CipherSuite,
    CredentialFinalization, CredentialRequest, RegistrationRequest, RegistrationUpload,
    ServerLogin, ServerLoginParameters, ServerRegistration, ServerSetup,
};
use rand::rngs::OsRng;
use shared::{
    crypto::{kek::Kek, primitives::b64url_decode},
    errors::ApiError,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::ActorClass;
use crate::repository::{OpaqueRepository, SettingsRepository};

/// Pins the OPRF group, AKE group, key-exchange protocol, and slow-hash
/// function this installation's OPAQUE instance runs. `Ksf` uses Argon2 over
/// the OPRF output per the upstream crate's recommended configuration for
/// stretching low-entropy passwords before the AKE.
pub struct DarkAuthCipherSuite;

impl CipherSuite for DarkAuthCipherSuite {
    type OprfCs = opaque_ke::Ristretto255;
    type KeGroup = opaque_ke::Ristretto255;
    type KeyExchange = opaque_ke::key_exchange::tripledh::TripleDh;
    type Ksf = argon2::Argon2<'static>;
}

const SERVER_SETUP_SETTING_KEY: &str = "opaque.server_setup";
const LOGIN_SESSION_TTL_SECONDS: i64 = 120;

/// Identity material recovered by a login finish: who actually authenticated,
/// read strictly from the server-held row, never from the caller's request.
pub struct LoginOutcome {
    pub actor_class: ActorClass,
    pub identity_u: String,
    pub session_key: Vec<u8>,
}

#[derive(Clone)]
pub struct OpaqueService {
    repository: OpaqueRepository,
    server_setup: Arc<ServerSetup<DarkAuthCipherSuite>>,
    kek: Arc<Kek>,
}

impl OpaqueService {
    /// Loads this installation's `ServerSetup` from settings, generating and
    /// persisting one (KEK-sealed) on first boot.
    pub async fn bootstrap(
        repository: OpaqueRepository,
        settings: &SettingsRepository,
        kek: Arc<Kek>,
    ) -> Result<Self, ApiError> {
        let server_setup = match settings.find(SERVER_SETUP_SETTING_KEY).await? {
            Some(setting) => {
                let sealed = setting
                    .value
                    .as_str()
                    .ok_or_else(|| ApiError::InternalError {
                        message: "opaque.server_setup is not a string".to_string(),
                    })?;
                let sealed_bytes = b64url_decode(sealed).map_err(|_| ApiError::InternalError {
                    message: "opaque.server_setup is not valid base64url".to_string(),
                })?;
                let raw = kek
                    .unseal(&sealed_bytes)
                    .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
                ServerSetup::<DarkAuthCipherSuite>::deserialize(&raw).map_err(|e| {
                    ApiError::InternalError { message: format!("corrupt OPAQUE server setup: {e}") }
                })?
            }
            None => {
                let fresh = ServerSetup::<DarkAuthCipherSuite>::new(&mut OsRng);
                let sealed = kek
                    .seal(&fresh.serialize())
                    .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
                settings
                    .upsert(
                        SERVER_SETUP_SETTING_KEY,
                        "opaque",
                        crate::domain::SettingType::String,
                        serde_json::json!(shared::crypto::primitives::b64url_encode(&sealed)),
                        serde_json::json!(null),
                        true,
                    )
                    .await?;
                fresh
            }
        };

        Ok(Self { repository, server_setup: Arc::new(server_setup), kek })
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// `request` is the client's `RegistrationRequest`; returns the server's
    /// `RegistrationResponse` bytes. Stateless — the client carries its own
    /// intermediate state until upload.
    pub fn registration_start(
        &self,
        request_bytes: &[u8],
        principal_id: Uuid,
    ) -> Result<Vec<u8>, ApiError> {
        let request = RegistrationRequest::<DarkAuthCipherSuite>::deserialize(request_bytes)
            .map_err(|_| ApiError::InvalidRequest { message: "malformed registration request".to_string() })?;

        let result = opaque_ke::ServerRegistration::<DarkAuthCipherSuite>::start(
            &self.server_setup,
            request,
            principal_id.as_bytes(),
        )
        .map_err(|_| ApiError::InternalError { message: "OPAQUE registration start failed".to_string() })?;

        Ok(result.message.serialize().to_vec())
    }

    /// Persists the client's uploaded envelope. `identity_u` is the user's
    /// email in plaintext; it is KEK-sealed here before it ever reaches the
    /// repository, so no plaintext identity touches storage.
    pub async fn registration_finish(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
        record_bytes: &[u8],
        identity_u: &str,
        identity_s: &str,
    ) -> Result<(), ApiError> {
        let upload = RegistrationUpload::<DarkAuthCipherSuite>::deserialize(record_bytes)
            .map_err(|_| ApiError::InvalidRequest { message: "malformed registration upload".to_string() })?;

        let record = ServerRegistration::<DarkAuthCipherSuite>::finish(upload);

        let identity_u_encrypted = self
            .kek
            .seal(identity_u.as_bytes())
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        self.repository
            .create_envelope(
                actor_class,
                principal_id,
                record.serialize().to_vec(),
                identity_u_encrypted,
                identity_s,
            )
            .await?;
        Ok(())
    }

    /// Looks up a principal's registration record for a login attempt.
    /// `login_start` needs the raw bytes (or `None`, for an unknown
    /// principal) before it can run the AKE; this is the one place outside
    /// this module allowed to know the envelope table exists, since the
    /// caller only ever gets the opaque record bytes back, never the row.
    pub async fn find_envelope_record(
        &self,
        actor_class: ActorClass,
        principal_id: Uuid,
    ) -> Result<Option<Vec<u8>>, ApiError> {
        Ok(self
            .repository
            .find_envelope(actor_class, principal_id)
            .await?
            .map(|envelope| envelope.record))
    }

    // =========================================================================
    // LOGIN
    // =========================================================================

    /// Starts a login. `email` is KEK-sealed and stored on the login-session
    /// row here; `login_finish` unseals it back out, so it remains the
    /// authoritative identity for this attempt regardless of what a later
    /// request body claims.
    pub async fn login_start(
        &self,
        actor_class: ActorClass,
        email: &str,
        registered_record: Option<&[u8]>,
        request_bytes: &[u8],
    ) -> Result<(Uuid, Vec<u8>), ApiError> {
        let request = CredentialRequest::<DarkAuthCipherSuite>::deserialize(request_bytes)
            .map_err(|_| ApiError::InvalidRequest { message: "malformed credential request".to_string() })?;

        let identity_u_encrypted = self
            .kek
            .seal(email.as_bytes())
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        let password_file = registered_record
            .map(ServerRegistration::<DarkAuthCipherSuite>::deserialize)
            .transpose()
            .map_err(|_| ApiError::InternalError { message: "corrupt OPAQUE envelope".to_string() })?;

        // Running the AKE regardless of whether `password_file` exists keeps
        // unknown-identity and wrong-credential timing indistinguishable.
        let result = ServerLogin::<DarkAuthCipherSuite>::start(
            &mut OsRng,
            &self.server_setup,
            password_file,
            request,
            email.as_bytes(),
            ServerLoginParameters::default(),
        )
        .map_err(|_| ApiError::InvalidCredentials)?;

        let expires_at = chrono::Utc::now() + chrono::Duration::seconds(LOGIN_SESSION_TTL_SECONDS);
        let row = self
            .repository
            .create_login_session(
                actor_class,
                result.state.serialize().to_vec(),
                identity_u_encrypted,
                expires_at,
            )
            .await?;

        Ok((row.session_id, result.message.serialize().to_vec()))
    }

    /// Consumes the login-session row, runs AKE finish, and returns the
    /// identity recorded at `start` time (never the caller's claim).
    pub async fn login_finish(
        &self,
        session_id: Uuid,
        ke3_bytes: &[u8],
    ) -> Result<LoginOutcome, ApiError> {
        let row = self
            .repository
            .consume_login_session(session_id)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        let state = ServerLogin::<DarkAuthCipherSuite>::deserialize(&row.server_state)
            .map_err(|_| ApiError::InvalidCredentials)?;
        let finalization = CredentialFinalization::<DarkAuthCipherSuite>::deserialize(ke3_bytes)
            .map_err(|_| ApiError::InvalidCredentials)?;

        let result = state
            .finish(finalization, ServerLoginParameters::default())
            .map_err(|_| ApiError::InvalidCredentials)?;

        let identity_u_bytes = self
            .kek
            .unseal(&row.identity_u_encrypted)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
        let identity_u = String::from_utf8(identity_u_bytes)
            .map_err(|_| ApiError::InternalError { message: "identityU is not UTF-8 after unseal".to_string() })?;

        Ok(LoginOutcome {
            actor_class: row.actor_class,
            identity_u,
            session_key: result.session_key.to_vec(),
        })
    }
}
