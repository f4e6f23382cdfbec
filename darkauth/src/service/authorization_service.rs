//! # Authorization Pipeline Service
//!
//! Orchestrates component #9, the `/authorize` → `/authorize/finalize` →
//! `/token` pipeline described in §4.4. A pending-authorization row is
//! created before the caller has even authenticated; finalize binds it to a
//! session and exchanges it for a single-use code; the token endpoint
//! exchanges that code (or a refresh token, or confidential-client
//! credentials) for an opaque access token and, for `openid` scope, a signed
//! ID token.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use shared::{
    crypto::primitives::{b64url_encode, random_token, sha256},
    errors::ApiError,
};
use uuid::Uuid;

use crate::domain::{AuthorizationCode, ClientType, PendingAuthorization, Session, User};
use crate::repository::AuthorizationRepository;
use crate::service::client_service::ClientService;
use crate::service::drk_service::DrkService;
use crate::service::jwks_service::JwksService;
use crate::service::rbac_service::RbacService;
use crate::service::session_service::SessionService;
use crate::service::user_service::UserService;

const PENDING_AUTHORIZATION_TTL_MINUTES: i64 = 10;
const AUTHORIZATION_CODE_TTL_SECONDS: i64 = 60;
const AUTHORIZATION_CODE_BYTES: usize = 32;
const ACCESS_TOKEN_TTL_SECONDS: i64 = 900;
const CLIENT_CREDENTIALS_TOKEN_TTL_SECONDS: i64 = 3600;

#[allow(clippy::too_many_arguments)]
pub struct StartAuthorizeRequest<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub response_type: &'a str,
    pub scope: &'a str,
    pub state: Option<&'a str>,
    pub nonce: Option<&'a str>,
    pub code_challenge: Option<&'a str>,
    pub code_challenge_method: Option<&'a str>,
    pub zk_pub_jwk: Option<Value>,
    pub origin: &'a str,
}

pub struct FinalizeResult {
    pub code: String,
    pub state: Option<String>,
    pub redirect_uri: String,
    pub drk_jwe: Option<String>,
}

pub struct TokenResult {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
}

#[derive(Clone)]
pub struct AuthorizationService {
    repository: AuthorizationRepository,
    clients: ClientService,
    sessions: SessionService,
    users: UserService,
    jwks: JwksService,
    rbac: RbacService,
    drk: DrkService,
    issuer: String,
}

impl AuthorizationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: AuthorizationRepository,
        clients: ClientService,
        sessions: SessionService,
        users: UserService,
        jwks: JwksService,
        rbac: RbacService,
        drk: DrkService,
        issuer: String,
    ) -> Self {
        Self { repository, clients, sessions, users, jwks, rbac, drk, issuer }
    }

    // =========================================================================
    // /authorize
    // =========================================================================

    /// Validates an `/authorize` request against its registered client and
    /// creates the pending-authorization row a subsequent `finalize` call
    /// binds to a session.
    pub async fn start_authorize(
        &self,
        request: StartAuthorizeRequest<'_>,
    ) -> Result<PendingAuthorization, ApiError> {
        let client = self.clients.find(request.client_id).await?.ok_or(ApiError::InvalidClient)?;
        self.clients.validate_redirect_uri(&client, request.redirect_uri)?;

        if request.response_type != "code" {
            return Err(ApiError::InvalidRequest {
                message: "response_type must be \"code\"".to_string(),
            });
        }

        let pkce_required = client.require_pkce || client.client_type == ClientType::Public;
        match (request.code_challenge, request.code_challenge_method) {
            (Some(_), Some(method)) if method != "S256" => {
                return Err(ApiError::InvalidRequest {
                    message: "code_challenge_method must be S256".to_string(),
                })
            }
            (None, _) if pkce_required => {
                return Err(ApiError::InvalidRequest {
                    message: "code_challenge is required for this client".to_string(),
                })
            }
            _ => {}
        }

        let requested_scopes: Vec<&str> = request.scope.split_whitespace().collect();
        if !requested_scopes.iter().all(|s| client.allowed_scopes.iter().any(|allowed| allowed == s)) {
            return Err(ApiError::InvalidRequest { message: "scope exceeds client's allowed scopes".to_string() });
        }
        if !requested_scopes.contains(&"openid") {
            return Err(ApiError::InvalidRequest { message: "openid scope is required".to_string() });
        }

        if let Some(ref jwk) = request.zk_pub_jwk {
            validate_zk_pub_jwk(jwk)?;
        }

        let expires_at = Utc::now() + ChronoDuration::minutes(PENDING_AUTHORIZATION_TTL_MINUTES);

        self.repository
            .create_pending(
                request.client_id,
                request.redirect_uri,
                request.response_type,
                request.scope,
                request.state,
                request.nonce,
                request.code_challenge,
                request.code_challenge_method,
                request.zk_pub_jwk,
                request.origin,
                expires_at,
            )
            .await
    }

    // =========================================================================
    // /authorize/finalize
    // =========================================================================

    /// Binds `session` to the pending request and issues a single-use
    /// authorization code. `drk_jwe`, if present, is the client-computed
    /// re-wrap of the DRK under the request's `zk_pub` key — the server never
    /// decrypts it, only binds its hash into the eventual ID token.
    pub async fn finalize(
        &self,
        request_id: Uuid,
        session: &Session,
        drk_jwe: Option<String>,
    ) -> Result<FinalizeResult, ApiError> {
        if SessionService::needs_step_up(session) {
            return Err(ApiError::UserLoginNotAllowed);
        }

        let pending = self
            .repository
            .find_pending(request_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "pending_authorization".to_string() })?;

        if pending.zk_pub_jwk.is_some() {
            let jwe = drk_jwe
                .as_deref()
                .ok_or_else(|| ApiError::InvalidRequest { message: "drk_jwe is required for this request".to_string() })?;
            self.drk.validate_drk_jwe_shape(jwe)?;
        }

        self.repository.bind_user(request_id, session.principal_id).await?;

        let pending = self
            .repository
            .consume_pending(request_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "pending_authorization".to_string() })?;

        let code = random_token(AUTHORIZATION_CODE_BYTES);
        let expires_at = Utc::now() + ChronoDuration::seconds(AUTHORIZATION_CODE_TTL_SECONDS);

        self.repository
            .create_code(
                &code,
                pending.request_id,
                session.principal_id,
                &pending.client_id,
                &pending.redirect_uri,
                &pending.scope,
                pending.nonce.as_deref(),
                pending.code_challenge.as_deref(),
                pending.code_challenge_method.as_deref(),
                expires_at,
                drk_jwe.as_deref(),
                session.otp_verified,
            )
            .await?;

        Ok(FinalizeResult { code, state: pending.state, redirect_uri: pending.redirect_uri, drk_jwe })
    }

    // =========================================================================
    // /token
    // =========================================================================

    /// `grant_type=authorization_code`. Single-use: a retried or replayed
    /// code always fails with `invalid_grant` since `consume_code` deletes
    /// the row on its first (and only) successful read.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenResult, ApiError> {
        let authorization_code = self.repository.consume_code(code).await?.ok_or(ApiError::InvalidGrant)?;

        if authorization_code.client_id != client_id || authorization_code.redirect_uri != redirect_uri {
            return Err(ApiError::InvalidGrant);
        }

        if let Some(ref challenge) = authorization_code.code_challenge {
            let verifier = code_verifier.ok_or(ApiError::InvalidGrant)?;
            let computed = b64url_encode(&sha256(verifier.as_bytes()));
            if &computed != challenge {
                return Err(ApiError::InvalidGrant);
            }
        }

        let user = self.users.get(authorization_code.user_sub).await?;
        let otp_verified = authorization_code.otp_verified;

        let id_token = self
            .build_id_token(&user, &authorization_code, otp_verified)
            .await?;

        let session = self
            .sessions
            .create(crate::domain::ActorClass::User, user.sub, &user.email, &user.name, false)
            .await?;

        Ok(TokenResult {
            access_token: session.session_id,
            refresh_token: Some(session.refresh_token),
            id_token: Some(id_token),
            token_type: "Bearer",
            expires_in: ACCESS_TOKEN_TTL_SECONDS,
            scope: authorization_code.scope,
        })
    }

    /// `grant_type=refresh_token`. Rotates the refresh token; the old one is
    /// invalidated the instant rotation succeeds, satisfying "a used refresh
    /// token cannot be reused" (§8).
    pub async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenResult, ApiError> {
        let session = self.sessions.refresh_by_token(refresh_token).await?;
        let user = self.users.get(session.principal_id).await?;

        let claims = self.build_user_claims(&user, &self.issuer, None, None).await?;
        let id_token = self.jwks.sign_jws(&claims).await?;

        Ok(TokenResult {
            access_token: session.session_id,
            refresh_token: Some(session.refresh_token),
            id_token: Some(id_token),
            token_type: "Bearer",
            expires_in: ACCESS_TOKEN_TTL_SECONDS,
            scope: "openid".to_string(),
        })
    }

    /// `grant_type=client_credentials`. Confidential clients only; no
    /// session is created, and the resulting access token carries the
    /// client's own identity rather than a user's.
    pub async fn exchange_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
        requested_scope: Option<&str>,
    ) -> Result<TokenResult, ApiError> {
        let client = self.clients.verify_secret(client_id, client_secret).await?;
        self.clients.validate_grant_type(&client, "client_credentials")?;

        let scope = requested_scope.unwrap_or("");
        let requested: Vec<&str> = scope.split_whitespace().collect();
        if !requested.iter().all(|s| client.allowed_scopes.iter().any(|allowed| allowed == s)) {
            return Err(ApiError::InvalidGrant);
        }

        let claims = json!({
            "iss": self.issuer,
            "sub": client.client_id,
            "aud": client.client_id,
            "iat": Utc::now().timestamp(),
            "exp": (Utc::now() + ChronoDuration::seconds(CLIENT_CREDENTIALS_TOKEN_TTL_SECONDS)).timestamp(),
            "scope": scope,
        });
        let access_token = self.jwks.sign_jws(&claims).await?;

        Ok(TokenResult {
            access_token,
            refresh_token: None,
            id_token: None,
            token_type: "Bearer",
            expires_in: CLIENT_CREDENTIALS_TOKEN_TTL_SECONDS,
            scope: scope.to_string(),
        })
    }

    // =========================================================================
    // ID token claim assembly
    // =========================================================================

    async fn build_id_token(
        &self,
        user: &User,
        code: &AuthorizationCode,
        otp_verified: bool,
    ) -> Result<String, ApiError> {
        let zk_drk_hash = code.drk_jwe.as_deref().map(|jwe| self.drk.drk_jwe_hash(jwe));
        let claims = self
            .build_user_claims(user, &code.client_id, code.nonce.as_deref(), zk_drk_hash)
            .await?
            .as_object()
            .cloned()
            .map(Value::Object)
            .unwrap_or(Value::Null);
        let claims = merge_otp_claims(claims, otp_verified);
        self.jwks.sign_jws(&claims).await
    }

    async fn build_user_claims(
        &self,
        user: &User,
        audience: &str,
        nonce: Option<&str>,
        zk_drk_hash: Option<String>,
    ) -> Result<Value, ApiError> {
        let roles = self.rbac.role_keys(user.sub).await?;
        let permissions = self.rbac.effective_permissions(user.sub).await?;
        let organizations = self.rbac.organizations_for_user(user.sub).await?;
        let organization = organizations.first();

        let now = Utc::now();
        let mut claims = json!({
            "iss": self.issuer,
            "sub": user.sub.to_string(),
            "aud": audience,
            "iat": now.timestamp(),
            "exp": (now + ChronoDuration::seconds(ACCESS_TOKEN_TTL_SECONDS)).timestamp(),
            "email": user.email,
            "name": user.name,
            "roles": roles,
            "permissions": permissions,
        });

        if let Some(nonce) = nonce {
            claims["nonce"] = json!(nonce);
        }
        if let Some(org) = organization {
            claims["org_id"] = json!(org.org_id.to_string());
            claims["org_slug"] = json!(org.slug);
        }
        if let Some(hash) = zk_drk_hash {
            claims["zk_drk_hash"] = json!(hash);
        }

        Ok(claims)
    }
}

fn merge_otp_claims(mut claims: Value, otp_verified: bool) -> Value {
    let mut amr = vec!["pwd"];
    if otp_verified {
        amr.push("otp");
    }
    claims["amr"] = json!(amr);
    claims["acr"] = json!(if otp_verified { "urn:darkauth:mfa" } else { "urn:darkauth:pwd" });
    claims
}

/// A `zk_pub` JWK must be a valid P-256 ECDH-ES public key in JSON Web Key
/// form — this only checks the shape, the same way `DrkService` only checks
/// `drk_jwe`'s shape, since the server never performs the ECDH itself.
fn validate_zk_pub_jwk(jwk: &Value) -> Result<(), ApiError> {
    let kty = jwk.get("kty").and_then(Value::as_str);
    let crv = jwk.get("crv").and_then(Value::as_str);
    let has_coords = jwk.get("x").and_then(Value::as_str).is_some() && jwk.get("y").and_then(Value::as_str).is_some();

    if kty == Some("EC") && crv == Some("P-256") && has_coords {
        Ok(())
    } else {
        Err(ApiError::InvalidRequest { message: "zk_pub must be a P-256 EC public JWK".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_zk_pub_jwk_requires_p256_coordinates() {
        let valid = json!({ "kty": "EC", "crv": "P-256", "x": "abc", "y": "def" });
        assert!(validate_zk_pub_jwk(&valid).is_ok());

        let missing_y = json!({ "kty": "EC", "crv": "P-256", "x": "abc" });
        assert!(validate_zk_pub_jwk(&missing_y).is_err());

        let wrong_curve = json!({ "kty": "EC", "crv": "P-384", "x": "abc", "y": "def" });
        assert!(validate_zk_pub_jwk(&wrong_curve).is_err());
    }

    #[test]
    fn test_merge_otp_claims_reflects_step_up() {
        let base = json!({});
        let without_otp = merge_otp_claims(base.clone(), false);
        assert_eq!(without_otp["amr"], json!(["pwd"]));
        assert_eq!(without_otp["acr"], json!("urn:darkauth:pwd"));

        let with_otp = merge_otp_claims(base, true);
        assert_eq!(with_otp["amr"], json!(["pwd", "otp"]));
        assert_eq!(with_otp["acr"], json!("urn:darkauth:mfa"));
    }
}
