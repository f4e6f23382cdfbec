//! # DarkAuth Core
//!
//! The **darkauth** binary is a zero-knowledge identity provider core: it
//! proves possession of a password via the OPAQUE aPAKE, runs an OIDC
//! authorization-code + PKCE pipeline over that proof, and custodies the
//! end-to-end-encrypted per-user data recovery key (DRK) without ever being
//! able to decrypt it.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HTTP Layer (api/)                        │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐ │
//! │  │   routes    │  │  handlers   │  │    DTOs (Request/Res)   │ │
//! │  └──────┬──────┘  └──────┬──────┘  └────────────┬────────────┘ │
//! └─────────┼────────────────┼─────────────────────┼───────────────┘
//!           │                │                      │
//!           ▼                ▼                      ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Service Layer (service/)                     │
//! │  opaque · jwks · session · rate_limiter · otp · rbac · audit    │
//! │  authorization · drk · install · settings · user · client       │
//! └─────────────────────────────┼───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Repository Layer (repository/)                 │
//! └─────────────────────────────┼───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (domain/)                       │
//! │  ┌──────────────┐  ┌───────────────┐  ┌─────────────────────┐   │
//! │  │   Entities   │  │ Events        │  │   (no value objects) │   │
//! │  └──────────────┘  └───────────────┘  └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two HTTP surfaces
//!
//! This process binds two ports from one binary: the user port (discovery,
//! `/authorize`, `/token`, OPAQUE, zero-knowledge DRK custody, OTP) and the
//! admin port (admin OPAQUE login plus the administration console's CRUD).
//! They share every service instance but never share a route tree or a
//! session cookie namespace.
//!
//! ## Configuration
//!
//! Loaded from a single YAML file via `--config`; see [`shared::config::AppConfig`].
//!
//! ## Exit codes
//!
//! Per [`shared::config::StartupError::exit_code`]: `0` success, `1` config
//! error, `2` storage init failure, `3` KEK init failure outside development.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use shared::{config::AppConfig, crypto::kek::Kek, database, tracing_config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod domain;
mod repository;
mod service;

use api::middleware as api_middleware;
use api::routes;
use repository::{
    AdminRepository, AuditRepository, AuthorizationRepository, ClientRepository, DrkRepository,
    InstallRepository, OpaqueRepository, OtpRepository, RbacRepository, SessionRepository,
    SettingsRepository, SigningKeyRepository, UserRepository,
};
use service::{
    AuditService, AuthorizationService, ClientService, DrkService, InstallService, JwksService,
    OpaqueService, OtpService, RateLimiter, RbacService, SessionService, SettingsService,
    UserService,
};

/// Shared application state injected into every request handler, on both
/// HTTP surfaces. Every field is cheap to clone (`PgPool`/`Arc` handles),
/// so this is rebuilt as `web::Data` once and shared across all workers of
/// both `HttpServer` instances.
pub struct AppState {
    pub config: AppConfig,
    pub audit: AuditService,
    pub authz: AuthorizationService,
    pub clients: ClientService,
    pub drk: DrkService,
    pub install: InstallService,
    pub jwks: JwksService,
    pub opaque: OpaqueService,
    pub otp: OtpService,
    pub rate_limiter: RateLimiter,
    pub rbac: RbacService,
    pub sessions: SessionService,
    pub settings: SettingsService,
    pub users: UserService,
}

/// `darkauth --config <path.yaml>`. A single YAML file drives every
/// deployment; container overrides still flow through `DARKAUTH_*` and
/// `DATABASE_URL`/`KEK_PASSPHRASE` env vars on top of it (see
/// [`AppConfig::from_file`]).
#[derive(Parser, Debug)]
#[command(name = "darkauth", about = "DarkAuth zero-knowledge identity provider core")]
struct Cli {
    #[arg(short, long, default_value = "darkauth.yaml")]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_file(&cli.config).unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        std::process::exit(1);
    });

    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        user_port = config.user_port,
        admin_port = config.admin_port,
        issuer = %config.issuer,
        "Starting darkauth"
    );

    let db_pool = database::create_pool(&config.postgres_uri, &config.database)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to create database pool");
            std::process::exit(2);
        });

    let kek = match config.kek_passphrase.as_deref() {
        Some(passphrase) => Kek::derive(passphrase).unwrap_or_else(|e| {
            tracing::error!(error = %e, "KEK derivation failed");
            std::process::exit(3);
        }),
        None => {
            if config.is_production() {
                tracing::error!("refusing to start in production without kekPassphrase configured");
                std::process::exit(3);
            }
            warn!("no kekPassphrase configured; running with an unavailable KEK (development only)");
            Kek::unavailable()
        }
    };
    let kek = Arc::new(kek);

    let admins = AdminRepository::new(db_pool.clone());
    let rbac_repo = RbacRepository::new(db_pool.clone());
    let settings_repo = SettingsRepository::new(db_pool.clone());
    let opaque_repo = OpaqueRepository::new(db_pool.clone());
    let users_repo = UserRepository::new(db_pool.clone());
    let sessions_repo = SessionRepository::new(db_pool.clone());
    let signing_keys_repo = SigningKeyRepository::new(db_pool.clone());
    let otp_repo = OtpRepository::new(db_pool.clone());
    let drk_repo = DrkRepository::new(db_pool.clone());
    let clients_repo = ClientRepository::new(db_pool.clone());
    let authz_repo = AuthorizationRepository::new(db_pool.clone());
    let audit_repo = AuditRepository::new(db_pool.clone());
    let install_repo = InstallRepository::new(db_pool.clone());

    let settings = SettingsService::new(settings_repo.clone());
    let rbac = RbacService::new(rbac_repo.clone(), admins.clone());
    let opaque = OpaqueService::bootstrap(opaque_repo, &settings_repo, kek.clone())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to bootstrap OPAQUE server setup");
            std::process::exit(2);
        });
    let users = UserService::new(users_repo, rbac_repo.clone());
    let sessions = SessionService::new(sessions_repo);
    let jwks = JwksService::new(signing_keys_repo, kek.clone());
    let otp = OtpService::new(otp_repo, rbac_repo.clone(), settings_repo.clone(), kek.clone());
    let drk = DrkService::new(drk_repo);
    let clients = ClientService::new(clients_repo, kek.clone());
    let authz = AuthorizationService::new(
        authz_repo,
        clients.clone(),
        sessions.clone(),
        users.clone(),
        jwks.clone(),
        rbac.clone(),
        drk.clone(),
        config.issuer.clone(),
    );
    let audit = AuditService::new(audit_repo);
    let install = InstallService::new(install_repo, opaque.clone(), jwks.clone(), rbac.clone(), admins, config.issuer.clone());
    let rate_limiter = RateLimiter::new(true);

    jwks.ensure_current_key().await.ok();
    if let Some(token) = std::env::var("DARKAUTH_INSTALL_TOKEN").ok() {
        install.seed_token(&token).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to seed install token");
        });
    }

    let app_state = web::Data::new(AppState {
        config: config.clone(),
        audit,
        authz,
        clients,
        drk,
        install,
        jwks,
        opaque,
        otp,
        rate_limiter,
        rbac,
        sessions,
        settings,
        users,
    });

    let user_port = config.user_port;
    let admin_port = config.admin_port;
    let user_origin = config.public_origin.clone();

    let user_state = app_state.clone();
    let user_server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&user_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .wrap(middleware::from_fn(api_middleware::timeout))
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(user_state.clone())
            .configure(routes::configure_user)
    })
    .bind(("0.0.0.0", user_port))?
    .run();

    let admin_state = app_state.clone();
    let admin_server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            .wrap(middleware::from_fn(api_middleware::timeout))
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(admin_state.clone())
            .configure(routes::configure_admin)
    })
    .bind(("127.0.0.1", admin_port))?
    .run();

    info!("user port listening on 0.0.0.0:{user_port}, admin port listening on 127.0.0.1:{admin_port}");

    tokio::try_join!(user_server, admin_server)?;
    Ok(())
}
