//! # HTTP Handlers
//!
//! actix-web handlers for both surfaces this process serves: the user port
//! (OIDC discovery, the authorize/token pipeline, OPAQUE registration and
//! login, zero-knowledge DRK custody, OTP step-up) and the admin port (the
//! same OPAQUE login engine bound to admin-class sessions, plus the
//! administration console's CRUD over users, clients, groups, organizations,
//! roles, permissions, settings, signing keys, and audit history).
//!
//! Every handler that authenticates a caller goes through [`authenticate_user`]
//! or [`authenticate_admin`], which resolve a [`Credential`] from either a
//! `__Host-DarkAuth-*` cookie pair or a bearer token and enforce CSRF on
//! mutating cookie-carried requests. Every handler that mutates state records
//! an audit entry through [`crate::service::audit_service::AuditService`],
//! success or failure, before returning.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use shared::crypto::primitives::{b64url_decode, b64url_encode};
use shared::errors::ApiError;
use shared::validation;

use crate::domain::events::{
    AdminResourceMutated, LoginFailed, LoginSucceeded, SessionRevocationReason, SessionRevoked,
    SigningKeyRotated, UserRegistered,
};
use crate::domain::{Admin, ActorClass, Session};
use crate::service::audit_service::AuditContext;
use crate::service::authorization_service::StartAuthorizeRequest;
use crate::service::rate_limiter::RateLimitClass;
use crate::service::session_service::Credential;
use crate::AppState;

use super::dto::*;

const USER_SESSION_COOKIE: &str = "__Host-DarkAuth-User";
const USER_CSRF_COOKIE: &str = "__Host-DarkAuth-User-Csrf";
const ADMIN_SESSION_COOKIE: &str = "__Host-DarkAuth-Admin";
const ADMIN_CSRF_COOKIE: &str = "__Host-DarkAuth-Admin-Csrf";

// =============================================================================
// CREDENTIAL / REQUEST HELPERS
// =============================================================================

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Decodes an `Authorization: Basic base64(client_id:client_secret)` header
/// per `client_secret_basic` (RFC 6749 §2.3.1). Confidential clients are
/// registered with this method (see `client_service::create`), so this is
/// the only accepted transport for their credentials at `/token`.
fn basic_auth_client_credentials(req: &HttpRequest) -> Option<(String, String)> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))?;
    let decoded = STANDARD.decode(header).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (client_id, client_secret) = decoded.split_once(':')?;
    Some((client_id.to_string(), client_secret.to_string()))
}

/// Resolves a [`Credential`] from either a bearer token or the named session
/// cookie plus the `X-CSRF-Token` header — the double-submit value the
/// session's own CSRF token is compared against, not the cookie itself.
fn extract_credential(req: &HttpRequest, session_cookie_name: &str) -> Result<Credential, ApiError> {
    if let Some(session_id) = bearer_token(req) {
        return Ok(Credential::Bearer { session_id });
    }

    let session_id = req
        .cookie(session_cookie_name)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::MissingAuth)?;

    let csrf_token = req
        .headers()
        .get("X-CSRF-Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Ok(Credential::Cookie { session_id, csrf_token })
}

async fn authenticate_user(state: &AppState, req: &HttpRequest, is_mutating: bool) -> Result<Session, ApiError> {
    let credential = extract_credential(req, USER_SESSION_COOKIE)?;
    let session = state.sessions.authenticate(&credential, is_mutating).await?;
    if session.actor_class != ActorClass::User {
        return Err(ApiError::AccessDenied);
    }
    state.sessions.touch(&session.session_id).await?;
    Ok(session)
}

async fn authenticate_admin(state: &AppState, req: &HttpRequest, is_mutating: bool) -> Result<(Session, Admin), ApiError> {
    let credential = extract_credential(req, ADMIN_SESSION_COOKIE)?;
    let session = state.sessions.authenticate(&credential, is_mutating).await?;
    if session.actor_class != ActorClass::Admin {
        return Err(ApiError::AccessDenied);
    }
    state.sessions.touch(&session.session_id).await?;
    let admin = state
        .rbac
        .find_admin(session.principal_id)
        .await?
        .ok_or(ApiError::AccessDenied)?;
    Ok((session, admin))
}

fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info().realip_remote_addr().map(str::to_string)
}

fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn decode_b64url(field: &str) -> Result<Vec<u8>, ApiError> {
    b64url_decode(field).map_err(|_| ApiError::InvalidRequest { message: "field is not valid base64url".to_string() })
}

fn session_cookie(name: &'static str, value: &str) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish()
}

fn csrf_cookie(name: &'static str, value: &str) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .path("/")
        .secure(true)
        .http_only(false)
        .same_site(SameSite::Strict)
        .finish()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name, "")
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::ZERO)
        .finish()
}

// =============================================================================
// HEALTH
// =============================================================================

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::default())
}

// =============================================================================
// DISCOVERY / JWKS
// =============================================================================

pub async fn openid_configuration(state: web::Data<AppState>) -> HttpResponse {
    let issuer = state.config.issuer.clone();
    let dto = OpenIdConfigurationDto {
        authorization_endpoint: format!("{issuer}/authorize"),
        token_endpoint: format!("{issuer}/token"),
        jwks_uri: format!("{issuer}/.well-known/jwks.json"),
        end_session_endpoint: format!("{issuer}/logout"),
        userinfo_endpoint: format!("{issuer}/session"),
        issuer,
        response_types_supported: vec!["code".to_string()],
        grant_types_supported: vec![
            "authorization_code".to_string(),
            "refresh_token".to_string(),
            "client_credentials".to_string(),
        ],
        subject_types_supported: vec!["public".to_string()],
        id_token_signing_alg_values_supported: vec!["EdDSA".to_string()],
        scopes_supported: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
        token_endpoint_auth_methods_supported: vec!["none".to_string(), "client_secret_basic".to_string()],
        code_challenge_methods_supported: vec!["S256".to_string()],
    };
    HttpResponse::Ok().json(dto)
}

pub async fn jwks(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let jwks = state.jwks.public_jwks().await?;
    Ok(HttpResponse::Ok().json(jwks))
}

// =============================================================================
// AUTHORIZE / TOKEN
// =============================================================================

pub async fn authorize_start(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<AuthorizeQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    validation::validate_request(&query)?;

    let zk_pub_jwk = query
        .zk_pub
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .map_err(|_| ApiError::InvalidRequest { message: "zk_pub is not valid JSON".to_string() })?;

    let origin = req
        .headers()
        .get(actix_web::http::header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&state.config.public_origin)
        .to_string();

    let pending = state
        .authz
        .start_authorize(StartAuthorizeRequest {
            client_id: &query.client_id,
            redirect_uri: &query.redirect_uri,
            response_type: &query.response_type,
            scope: &query.scope,
            state: query.state.as_deref(),
            nonce: query.nonce.as_deref(),
            code_challenge: query.code_challenge.as_deref(),
            code_challenge_method: query.code_challenge_method.as_deref(),
            zk_pub_jwk,
            origin: &origin,
        })
        .await?;

    Ok(HttpResponse::Ok().json(PendingAuthorizationDto { request_id: pending.request_id }))
}

pub async fn authorize_finalize(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<FinalizeAuthorizeRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let session = authenticate_user(&state, &req, true).await?;

    let result = state.authz.finalize(body.request_id, &session, body.drk_jwe).await?;

    Ok(HttpResponse::Ok().json(FinalizeAuthorizeResponse {
        code: result.code,
        state: result.state,
        drk_jwe: result.drk_jwe,
    }))
}

pub async fn token(state: web::Data<AppState>, req: HttpRequest, body: web::Form<TokenRequest>) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let ip = client_ip(&req).unwrap_or_default();
    state.rate_limiter.check(RateLimitClass::Token, &ip)?;

    let result = match body.grant_type.as_str() {
        "authorization_code" => {
            let code = body.code.ok_or_else(|| ApiError::InvalidRequest { message: "code is required".to_string() })?;
            let redirect_uri = body
                .redirect_uri
                .ok_or_else(|| ApiError::InvalidRequest { message: "redirect_uri is required".to_string() })?;
            let client_id = body
                .client_id
                .ok_or_else(|| ApiError::InvalidRequest { message: "client_id is required".to_string() })?;
            state
                .authz
                .exchange_authorization_code(&code, &client_id, &redirect_uri, body.code_verifier.as_deref())
                .await
        }
        "refresh_token" => {
            let refresh_token = body
                .refresh_token
                .ok_or_else(|| ApiError::InvalidRequest { message: "refresh_token is required".to_string() })?;
            state.authz.exchange_refresh_token(&refresh_token).await
        }
        "client_credentials" => {
            if body.client_id.is_some() || body.client_secret.is_some() {
                Err(ApiError::InvalidClient)
            } else {
                let (client_id, client_secret) =
                    basic_auth_client_credentials(&req).ok_or(ApiError::InvalidClient)?;
                state
                    .authz
                    .exchange_client_credentials(&client_id, &client_secret, body.scope.as_deref())
                    .await
            }
        }
        _ => Err(ApiError::InvalidRequest { message: "unsupported grant_type".to_string() }),
    };

    match result {
        Ok(token_result) => {
            let dto: TokenResponseDto = token_result.into();
            Ok(HttpResponse::Ok().json(dto))
        }
        Err(err) => {
            state
                .audit
                .record(
                    &crate::domain::events::TokenRejected {
                        client_id: body.client_id,
                        error_code: err.error_code().to_string(),
                        occurred_at: Utc::now(),
                    },
                    false,
                    AuditContext { ip: client_ip(&req), user_agent: user_agent(&req), ..AuditContext::empty() },
                )
                .await
                .ok();
            Err(err)
        }
    }
}

// =============================================================================
// SESSION / LOGOUT (user surface)
// =============================================================================

pub async fn user_session(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = authenticate_user(&state, &req, false).await?;
    Ok(HttpResponse::Ok().json(SessionIntrospectionDto {
        sub: session.principal_id,
        email: session.email,
        name: session.name,
        otp_required: session.otp_required,
        otp_verified: session.otp_verified,
        expires_at: session.expires_at,
    }))
}

pub async fn user_logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let credential = extract_credential(&req, USER_SESSION_COOKIE)?;
    let session = state.sessions.authenticate(&credential, true).await?;
    state.sessions.revoke(&session.session_id).await?;

    state
        .audit
        .record(
            &SessionRevoked {
                principal_id: session.principal_id,
                session_id: session.session_id.clone(),
                reason: SessionRevocationReason::Logout,
                occurred_at: Utc::now(),
            },
            true,
            AuditContext {
                actor_class: Some(ActorClass::User),
                actor_email: Some(session.email.clone()),
                ip: client_ip(&req),
                user_agent: user_agent(&req),
                ..AuditContext::empty()
            },
        )
        .await
        .ok();

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(USER_SESSION_COOKIE))
        .cookie(expired_cookie(USER_CSRF_COOKIE))
        .json(MessageResponse::new("logged out")))
}

// =============================================================================
// OPAQUE (user surface)
// =============================================================================

pub async fn opaque_register_start(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<OpaqueRegisterStartRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ip = client_ip(&req).unwrap_or_default();
    state.rate_limiter.check(RateLimitClass::Opaque, &ip)?;

    if state.users.email_exists(&body.email).await? {
        return Err(ApiError::Conflict { resource: "email".to_string() });
    }

    let user = state.users.create(&body.email, &body.name).await?;

    let request_bytes = decode_b64url(&body.request)?;
    let response = state.opaque.registration_start(&request_bytes, user.sub)?;

    Ok(HttpResponse::Ok().json(OpaqueRegisterStartResponse { response: b64url_encode(&response) }))
}

pub async fn opaque_register_finish(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<OpaqueRegisterFinishRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ip = client_ip(&req).unwrap_or_default();
    state.rate_limiter.check(RateLimitClass::OpaqueFinish, &ip)?;

    let user = state
        .users
        .find_by_email(&body.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest { message: "call opaque/register/start before finish".to_string() })?;

    let record_bytes = decode_b64url(&body.record)?;
    state
        .opaque
        .registration_finish(ActorClass::User, user.sub, &record_bytes, &body.email, &state.config.issuer)
        .await?;

    state
        .audit
        .record(
            &UserRegistered { user_sub: user.sub, email: body.email.clone(), ip: client_ip(&req), occurred_at: Utc::now() },
            true,
            AuditContext {
                actor_class: Some(ActorClass::User),
                actor_email: Some(body.email),
                ip: client_ip(&req),
                user_agent: user_agent(&req),
                ..AuditContext::empty()
            },
        )
        .await
        .ok();

    Ok(HttpResponse::Ok().json(MessageResponse::new("registration complete")))
}

pub async fn opaque_login_start(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<OpaqueLoginStartRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ip = client_ip(&req).unwrap_or_default();
    state.rate_limiter.check(RateLimitClass::Opaque, &ip)?;

    let registered_record = match state.users.find_by_email(&body.email).await? {
        Some(user) => state.opaque.find_envelope_record(ActorClass::User, user.sub).await?,
        None => None,
    };

    let request_bytes = decode_b64url(&body.request)?;
    let (session_id, message) = state
        .opaque
        .login_start(ActorClass::User, &body.email, registered_record.as_deref(), &request_bytes)
        .await?;

    Ok(HttpResponse::Ok().json(OpaqueLoginStartResponse { session_id, message: b64url_encode(&message) }))
}

pub async fn opaque_login_finish(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<OpaqueLoginFinishRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.rate_limiter.check(RateLimitClass::OpaqueFinish, &body.session_id.to_string())?;

    let finish_bytes = decode_b64url(&body.finish)?;
    let outcome = match state.opaque.login_finish(body.session_id, &finish_bytes).await {
        Ok(outcome) => outcome,
        Err(err) => {
            state
                .audit
                .record(
                    &LoginFailed {
                        actor_class: ActorClass::User,
                        ip: client_ip(&req),
                        user_agent: user_agent(&req),
                        occurred_at: Utc::now(),
                    },
                    false,
                    AuditContext { ip: client_ip(&req), user_agent: user_agent(&req), ..AuditContext::empty() },
                )
                .await
                .ok();
            return Err(err);
        }
    };

    let user = state
        .users
        .find_by_email(&outcome.identity_u)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !state.otp.is_login_allowed(user.sub).await? {
        state
            .audit
            .record(
                &crate::domain::events::LoginNotAllowed {
                    principal_id: user.sub,
                    reason: "group disables login".to_string(),
                    occurred_at: Utc::now(),
                },
                false,
                AuditContext {
                    actor_class: Some(ActorClass::User),
                    actor_email: Some(user.email.clone()),
                    ip: client_ip(&req),
                    user_agent: user_agent(&req),
                    ..AuditContext::empty()
                },
            )
            .await
            .ok();
        return Err(ApiError::UserLoginNotAllowed);
    }

    let otp_required = state.otp.resolve_otp_required(ActorClass::User, user.sub).await?;
    let session = state
        .sessions
        .create(ActorClass::User, user.sub, &user.email, &user.name, otp_required)
        .await?;

    state
        .audit
        .record(
            &LoginSucceeded {
                actor_class: ActorClass::User,
                principal_id: user.sub,
                session_id: session.session_id.clone(),
                ip: client_ip(&req),
                user_agent: user_agent(&req),
                occurred_at: Utc::now(),
            },
            true,
            AuditContext {
                actor_class: Some(ActorClass::User),
                actor_email: Some(user.email.clone()),
                ip: client_ip(&req),
                user_agent: user_agent(&req),
                ..AuditContext::empty()
            },
        )
        .await
        .ok();

    let dto = OpaqueLoginFinishResponse {
        access_token: session.session_id.clone(),
        refresh_token: session.refresh_token.clone(),
        sub: user.sub,
        user: user.into(),
        otp_required,
        session_key: b64url_encode(&outcome.session_key),
    };

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(USER_SESSION_COOKIE, &session.session_id))
        .cookie(csrf_cookie(USER_CSRF_COOKIE, &session.csrf_token))
        .json(dto))
}

// =============================================================================
// ZK DRK CUSTODY (user surface)
// =============================================================================

pub async fn put_wrapped_drk(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<WrappedBlobRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let session = authenticate_user(&state, &req, true).await?;
    let bytes = decode_b64url(&body.wrapped)?;
    state.drk.put_wrapped_drk(session.principal_id, &bytes).await?;
    Ok(HttpResponse::Ok().json(WrappedBlobResponse { wrapped: body.wrapped }))
}

pub async fn get_wrapped_drk(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = authenticate_user(&state, &req, false).await?;
    let record = state
        .drk
        .get_wrapped_drk(session.principal_id)
        .await?
        .ok_or_else(|| ApiError::NotFound { resource: "wrapped_drk".to_string() })?;
    Ok(HttpResponse::Ok().json(WrappedBlobResponse { wrapped: b64url_encode(&record.wrapped_drk_bytes) }))
}

pub async fn put_wrapped_enc_priv(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<WrappedBlobRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let session = authenticate_user(&state, &req, true).await?;
    let bytes = decode_b64url(&body.wrapped)?;
    state.drk.put_enc_priv_jwk_wrapped(session.principal_id, &bytes).await?;
    Ok(HttpResponse::Ok().json(WrappedBlobResponse { wrapped: body.wrapped }))
}

pub async fn get_wrapped_enc_priv(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = authenticate_user(&state, &req, false).await?;
    let record = state
        .drk
        .get_enc_priv_jwk_wrapped(session.principal_id)
        .await?
        .ok_or_else(|| ApiError::NotFound { resource: "wrapped_enc_priv".to_string() })?;
    Ok(HttpResponse::Ok().json(WrappedBlobResponse { wrapped: b64url_encode(&record.wrapped_jwk_bytes) }))
}

pub async fn put_user_enc_pub(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UserEncPubJwkRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let session = authenticate_user(&state, &req, true).await?;
    let record = state.drk.put_enc_pub_jwk(session.principal_id, body.jwk).await?;
    Ok(HttpResponse::Ok().json(UserEncPubJwkResponse { jwk: record.jwk }))
}

pub async fn get_user_enc_pub(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let record = state
        .drk
        .get_enc_pub_jwk(path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound { resource: "user_enc_pub".to_string() })?;
    Ok(HttpResponse::Ok().json(UserEncPubJwkResponse { jwk: record.jwk }))
}

// =============================================================================
// USER DIRECTORY (user surface)
// =============================================================================

pub async fn list_users(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, ApiError> {
    authenticate_user(&state, &req, false).await?;
    let query = query.into_inner();
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);
    let users = state.users.directory(limit, offset).await?;
    Ok(HttpResponse::Ok().json(UserDirectoryResponse { users }))
}

pub async fn get_user(state: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    authenticate_user(&state, &req, false).await?;
    let user = state.users.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserProfileDto::from(user)))
}

// =============================================================================
// OTP (user surface)
// =============================================================================

pub async fn otp_setup_init(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = authenticate_user(&state, &req, true).await?;
    let init = state
        .otp
        .setup_init(ActorClass::User, session.principal_id, &session.email, &state.config.issuer)
        .await?;
    Ok(HttpResponse::Ok().json(OtpSetupInitResponse { secret: init.secret_base32, provisioning_uri: init.provisioning_uri }))
}

pub async fn otp_setup_verify(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<OtpCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let session = authenticate_user(&state, &req, true).await?;
    let result = state.otp.setup_verify(ActorClass::User, session.principal_id, &body.code).await?;
    Ok(HttpResponse::Ok().json(OtpSetupVerifyResponse { backup_codes: result.backup_codes }))
}

pub async fn otp_verify(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<OtpCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let session = authenticate_user(&state, &req, true).await?;
    state.otp.verify(ActorClass::User, session.principal_id, &body.code).await?;
    state.sessions.set_otp_verified(&session.session_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("otp verified")))
}

pub async fn otp_status(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = authenticate_user(&state, &req, false).await?;
    let (enrolled, verified) = state.otp.enrollment_state(ActorClass::User, session.principal_id).await?;
    Ok(HttpResponse::Ok().json(OtpStatusResponse { enrolled, verified }))
}

// =============================================================================
// ADMIN: LOGIN
// =============================================================================

/// Admin console login has no OIDC pipeline of its own — it authenticates
/// straight to an admin-class session, distinct from the `/authorize` flow
/// the user-facing OPAQUE engine feeds.
pub async fn admin_opaque_login_start(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<OpaqueLoginStartRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let ip = client_ip(&req).unwrap_or_default();
    state.rate_limiter.check(RateLimitClass::Opaque, &ip)?;

    let registered_record = match state.rbac.find_admin_by_email(&body.email).await? {
        Some(admin) => state.opaque.find_envelope_record(ActorClass::Admin, admin.admin_id).await?,
        None => None,
    };

    let request_bytes = decode_b64url(&body.request)?;
    let (session_id, message) = state
        .opaque
        .login_start(ActorClass::Admin, &body.email, registered_record.as_deref(), &request_bytes)
        .await?;

    Ok(HttpResponse::Ok().json(OpaqueLoginStartResponse { session_id, message: b64url_encode(&message) }))
}

pub async fn admin_opaque_login_finish(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<OpaqueLoginFinishRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.rate_limiter.check(RateLimitClass::OpaqueFinish, &body.session_id.to_string())?;

    let finish_bytes = decode_b64url(&body.finish)?;
    let outcome = match state.opaque.login_finish(body.session_id, &finish_bytes).await {
        Ok(outcome) => outcome,
        Err(err) => {
            state
                .audit
                .record(
                    &LoginFailed {
                        actor_class: ActorClass::Admin,
                        ip: client_ip(&req),
                        user_agent: user_agent(&req),
                        occurred_at: Utc::now(),
                    },
                    false,
                    AuditContext { ip: client_ip(&req), user_agent: user_agent(&req), ..AuditContext::empty() },
                )
                .await
                .ok();
            return Err(err);
        }
    };

    let admin = state
        .rbac
        .find_admin_by_email(&outcome.identity_u)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let otp_required = state.otp.resolve_otp_required(ActorClass::Admin, admin.admin_id).await?;
    let session = state
        .sessions
        .create(ActorClass::Admin, admin.admin_id, &admin.email, &admin.name, otp_required)
        .await?;

    state
        .audit
        .record(
            &LoginSucceeded {
                actor_class: ActorClass::Admin,
                principal_id: admin.admin_id,
                session_id: session.session_id.clone(),
                ip: client_ip(&req),
                user_agent: user_agent(&req),
                occurred_at: Utc::now(),
            },
            true,
            AuditContext {
                actor_class: Some(ActorClass::Admin),
                actor_email: Some(admin.email.clone()),
                ip: client_ip(&req),
                user_agent: user_agent(&req),
                ..AuditContext::empty()
            },
        )
        .await
        .ok();

    let dto = AdminLoginFinishResponse {
        access_token: session.session_id.clone(),
        refresh_token: session.refresh_token.clone(),
        admin: admin.into(),
        otp_required,
    };

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(ADMIN_SESSION_COOKIE, &session.session_id))
        .cookie(csrf_cookie(ADMIN_CSRF_COOKIE, &session.csrf_token))
        .json(dto))
}

pub async fn admin_session(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let (session, _admin) = authenticate_admin(&state, &req, false).await?;
    Ok(HttpResponse::Ok().json(SessionIntrospectionDto {
        sub: session.principal_id,
        email: session.email,
        name: session.name,
        otp_required: session.otp_required,
        otp_verified: session.otp_verified,
        expires_at: session.expires_at,
    }))
}

pub async fn admin_logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let (session, admin) = authenticate_admin(&state, &req, true).await?;
    state.sessions.revoke(&session.session_id).await?;

    state
        .audit
        .record(
            &SessionRevoked {
                principal_id: session.principal_id,
                session_id: session.session_id.clone(),
                reason: SessionRevocationReason::Logout,
                occurred_at: Utc::now(),
            },
            true,
            AuditContext {
                actor_class: Some(ActorClass::Admin),
                actor_email: Some(admin.email),
                ip: client_ip(&req),
                user_agent: user_agent(&req),
                ..AuditContext::empty()
            },
        )
        .await
        .ok();

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(ADMIN_SESSION_COOKIE))
        .cookie(expired_cookie(ADMIN_CSRF_COOKIE))
        .json(MessageResponse::new("logged out")))
}

// =============================================================================
// ADMIN: helpers shared by the mutating admin handlers below
// =============================================================================

async fn record_admin_mutation(
    state: &AppState,
    req: &HttpRequest,
    admin: &Admin,
    resource_type: &str,
    resource_id: &str,
    action: &str,
) {
    state
        .audit
        .record(
            &AdminResourceMutated {
                admin_id: admin.admin_id,
                resource_type: resource_type.to_string(),
                resource_id: resource_id.to_string(),
                action: action.to_string(),
                occurred_at: Utc::now(),
            },
            true,
            AuditContext {
                actor_class: Some(ActorClass::Admin),
                actor_email: Some(admin.email.clone()),
                resource_type: Some(resource_type.to_string()),
                resource_id: Some(resource_id.to_string()),
                ip: client_ip(req),
                user_agent: user_agent(req),
            },
        )
        .await
        .ok();
}

// =============================================================================
// ADMIN: SESSIONS
// =============================================================================

pub async fn admin_list_sessions_for_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    let sessions = state.sessions.list_for_principal(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(SessionListResponse { sessions: sessions.into_iter().map(SessionSummaryDto::from).collect() }))
}

pub async fn admin_revoke_sessions_for_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    let user_sub = path.into_inner();
    state.sessions.revoke_all_for_principal(user_sub).await?;
    record_admin_mutation(&state, &req, &admin, "session", &user_sub.to_string(), "revoke_all").await;
    Ok(HttpResponse::Ok().json(MessageResponse::new("sessions revoked")))
}

// =============================================================================
// ADMIN: USERS
// =============================================================================

pub async fn admin_list_users(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    let query = query.into_inner();
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);
    let users = state.users.directory(limit, offset).await?;
    Ok(HttpResponse::Ok().json(UserDirectoryResponse { users }))
}

pub async fn admin_get_user(state: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    let user = state.users.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserProfileDto::from(user)))
}

pub async fn admin_delete_user(state: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let user_sub = path.into_inner();
    state.users.delete(user_sub).await?;
    record_admin_mutation(&state, &req, &admin, "user", &user_sub.to_string(), "delete").await;
    Ok(HttpResponse::Ok().json(MessageResponse::new("user deleted")))
}

// =============================================================================
// ADMIN: GROUPS / ORGANIZATIONS / ROLES / PERMISSIONS
// =============================================================================

pub async fn admin_list_groups(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    Ok(HttpResponse::Ok().json(state.rbac.list_groups().await?))
}

pub async fn admin_create_group(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let group = state.rbac.create_group(&body.key, &body.name, body.enable_login, body.require_otp).await?;
    record_admin_mutation(&state, &req, &admin, "group", &group.key, "create").await;
    Ok(HttpResponse::Ok().json(group))
}

pub async fn admin_set_group_flags(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<SetGroupFlagsRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let key = path.into_inner();
    state.rbac.set_group_flags(&key, body.enable_login, body.require_otp).await?;
    record_admin_mutation(&state, &req, &admin, "group", &key, "set_flags").await;
    Ok(HttpResponse::Ok().json(MessageResponse::new("group updated")))
}

pub async fn admin_add_user_to_group(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<AddUserToGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let key = path.into_inner();
    state.rbac.add_user_to_group(body.user_sub, &key).await?;
    record_admin_mutation(&state, &req, &admin, "group_membership", &format!("{key}:{}", body.user_sub), "add").await;
    Ok(HttpResponse::Ok().json(MessageResponse::new("user added to group")))
}

pub async fn admin_list_organizations(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    Ok(HttpResponse::Ok().json(state.rbac.list_organizations().await?))
}

pub async fn admin_create_organization(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateOrganizationRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let organization = state.rbac.create_organization(&body.name, &body.slug, body.force_otp).await?;
    record_admin_mutation(&state, &req, &admin, "organization", &organization.slug, "create").await;
    Ok(HttpResponse::Ok().json(organization))
}

pub async fn admin_list_roles(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    Ok(HttpResponse::Ok().json(state.rbac.list_roles().await?))
}

pub async fn admin_create_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let role = state.rbac.create_role(&body.key, &body.name, body.system).await?;
    record_admin_mutation(&state, &req, &admin, "role", &role.key, "create").await;
    Ok(HttpResponse::Ok().json(role))
}

pub async fn admin_list_permissions(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    Ok(HttpResponse::Ok().json(state.rbac.list_permissions().await?))
}

pub async fn admin_create_permission(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreatePermissionRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let permission = state.rbac.create_permission(&body.key, &body.description).await?;
    record_admin_mutation(&state, &req, &admin, "permission", &permission.key, "create").await;
    Ok(HttpResponse::Ok().json(permission))
}

// =============================================================================
// ADMIN: CLIENTS
// =============================================================================

pub async fn admin_list_clients(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    let clients = state.clients.list().await?;
    Ok(HttpResponse::Ok().json(clients.into_iter().map(ClientDto::from).collect::<Vec<_>>()))
}

pub async fn admin_create_client(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateClientRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;

    let created = state
        .clients
        .create(&body.client_id, body.client_type, &body.name, body.redirect_uris, body.grant_types, body.allowed_scopes)
        .await?;
    record_admin_mutation(&state, &req, &admin, "client", &created.client.client_id, "create").await;

    let mut dto = ClientDto::from(created.client);
    dto.client_secret = created.plaintext_secret;
    Ok(HttpResponse::Ok().json(dto))
}

pub async fn admin_delete_client(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let client_id = path.into_inner();
    state.clients.delete(&client_id).await?;
    record_admin_mutation(&state, &req, &admin, "client", &client_id, "delete").await;
    Ok(HttpResponse::Ok().json(MessageResponse::new("client deleted")))
}

// =============================================================================
// ADMIN: SETTINGS
// =============================================================================

pub async fn admin_list_settings(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    Ok(HttpResponse::Ok().json(state.settings.list(None).await?))
}

pub async fn admin_set_setting_value(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<SetSettingValueRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let key = path.into_inner();
    let setting = state.settings.set_value(&key, body.value).await?;
    record_admin_mutation(&state, &req, &admin, "setting", &key, "set_value").await;
    Ok(HttpResponse::Ok().json(setting))
}

pub async fn admin_reset_setting(state: web::Data<AppState>, req: HttpRequest, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let key = path.into_inner();
    let setting = state.settings.reset_to_default(&key).await?;
    record_admin_mutation(&state, &req, &admin, "setting", &key, "reset_to_default").await;
    Ok(HttpResponse::Ok().json(setting))
}

// =============================================================================
// ADMIN: KEYS
// =============================================================================

pub async fn admin_rotate_key(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let ip = client_ip(&req).unwrap_or_default();
    state.rate_limiter.check(RateLimitClass::AdminSensitive, &ip)?;

    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;

    let new_kid = state.jwks.rotate().await?;

    state
        .audit
        .record(
            &SigningKeyRotated { new_kid: new_kid.clone(), retired_kid: None, occurred_at: Utc::now() },
            true,
            AuditContext {
                actor_class: Some(ActorClass::Admin),
                actor_email: Some(admin.email),
                resource_type: Some("signing_key".to_string()),
                resource_id: Some(new_kid.clone()),
                ip: client_ip(&req),
                user_agent: user_agent(&req),
            },
        )
        .await
        .ok();

    Ok(HttpResponse::Ok().json(RotateKeyResponse { new_kid }))
}

// =============================================================================
// ADMIN: AUDIT
// =============================================================================

pub async fn admin_list_audit(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<AuditQuery>,
) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    let query = query.into_inner();
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);
    let entries = state
        .audit
        .list(query.event_type.as_deref(), query.actor_id, query.since, limit, offset)
        .await?;
    Ok(HttpResponse::Ok().json(AuditListResponse { entries }))
}

// =============================================================================
// ADMIN: ADMIN-USERS
// =============================================================================

pub async fn admin_list_admins(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    authenticate_admin(&state, &req, false).await?;
    let admins = state.rbac.list_admins().await?;
    Ok(HttpResponse::Ok().json(admins.into_iter().map(AdminDto::from).collect::<Vec<_>>()))
}

pub async fn admin_create_admin(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateAdminRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;

    let created = state.rbac.create_admin(&body.email, &body.name, body.role).await?;
    record_admin_mutation(&state, &req, &admin, "admin", &created.admin_id.to_string(), "create").await;
    Ok(HttpResponse::Ok().json(AdminDto::from(created)))
}

pub async fn admin_update_admin_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateAdminRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let target_admin_id = path.into_inner();
    state.rbac.require_not_self(&admin, target_admin_id)?;

    let updated = state.rbac.update_admin_role(target_admin_id, body.role).await?;
    record_admin_mutation(&state, &req, &admin, "admin", &target_admin_id.to_string(), "update_role").await;
    Ok(HttpResponse::Ok().json(AdminDto::from(updated)))
}

pub async fn admin_delete_admin(state: web::Data<AppState>, req: HttpRequest, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let (_session, admin) = authenticate_admin(&state, &req, true).await?;
    state.rbac.require_write(&admin)?;
    let target_admin_id = path.into_inner();
    state.rbac.require_not_self(&admin, target_admin_id)?;

    state.rbac.delete_admin(target_admin_id).await?;
    record_admin_mutation(&state, &req, &admin, "admin", &target_admin_id.to_string(), "delete").await;
    Ok(HttpResponse::Ok().json(MessageResponse::new("admin deleted")))
}

// =============================================================================
// INSTALL
// =============================================================================

pub async fn install_status(state: web::Data<AppState>, query: web::Query<InstallTokenQuery>) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    state.install.validate_token(&query.token).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("install token is valid")))
}

pub async fn install_opaque_start(
    state: web::Data<AppState>,
    body: web::Json<InstallOpaqueStartRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let request_bytes = decode_b64url(&body.request)?;
    let response = state
        .install
        .opaque_register_start(&body.token, &body.email, &body.name, &request_bytes)
        .await?;
    Ok(HttpResponse::Ok().json(OpaqueRegisterStartResponse { response: b64url_encode(&response) }))
}

pub async fn install_opaque_finish(
    state: web::Data<AppState>,
    body: web::Json<InstallOpaqueFinishRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    let record_bytes = decode_b64url(&body.record)?;
    state.install.opaque_register_finish(&body.token, &body.email, &record_bytes).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("install registration complete")))
}

pub async fn install_complete(state: web::Data<AppState>, body: web::Json<InstallCompleteRequest>) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;
    state.install.complete(&body.token, &body.email).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("installation complete")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_extract_credential_prefers_bearer_over_cookie() {
        let req = TestRequest::get()
            .insert_header((actix_web::http::header::AUTHORIZATION, "Bearer abc123"))
            .cookie(Cookie::new(USER_SESSION_COOKIE, "cookie-session"))
            .to_http_request();

        let credential = extract_credential(&req, USER_SESSION_COOKIE).unwrap();
        assert_eq!(credential.session_id(), "abc123");
    }

    #[test]
    fn test_extract_credential_falls_back_to_cookie_pair() {
        let req = TestRequest::get()
            .cookie(Cookie::new(USER_SESSION_COOKIE, "cookie-session"))
            .insert_header(("X-CSRF-Token", "csrf-value"))
            .to_http_request();

        let credential = extract_credential(&req, USER_SESSION_COOKIE).unwrap();
        assert_eq!(credential.session_id(), "cookie-session");
        match credential {
            Credential::Cookie { csrf_token, .. } => assert_eq!(csrf_token, "csrf-value"),
            Credential::Bearer { .. } => panic!("expected cookie credential"),
        }
    }

    #[test]
    fn test_extract_credential_missing_everything_is_missing_auth() {
        let req = TestRequest::get().to_http_request();
        assert!(matches!(extract_credential(&req, USER_SESSION_COOKIE), Err(ApiError::MissingAuth)));
    }
}
