//! # Service Layer
//!
//! Business logic sits here, between the repository layer (data access) and
//! the API layer (HTTP handling). Every service is `Clone` and holds only
//! cheap handles (`PgPool`, `Arc<...>`) so it can be stored in `AppState` and
//! shared across Actix-web workers without locking.
//!
//! ## Clean Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            API Layer                                    │
//! │                    (HTTP handlers, DTOs)                                │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Service Layer                                  │
//! │  opaque · jwks · session · rate_limiter · otp · rbac · audit            │
//! │  authorization · drk · install · settings                               │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Repository Layer          │    Shared Crypto Primitives    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audit_service;
pub mod authorization_service;
pub mod client_service;
pub mod drk_service;
pub mod install_service;
pub mod jwks_service;
pub mod opaque_service;
pub mod otp_service;
pub mod rate_limiter;
pub mod rbac_service;
pub mod session_service;
pub mod settings_service;
pub mod user_service;

pub use audit_service::AuditService;
pub use authorization_service::AuthorizationService;
pub use client_service::ClientService;
pub use drk_service::DrkService;
pub use install_service::InstallService;
pub use jwks_service::JwksService;
pub use opaque_service::OpaqueService;
pub use otp_service::OtpService;
pub use rate_limiter::RateLimiter;
pub use rbac_service::RbacService;
pub use session_service::SessionService;
pub use settings_service::SettingsService;
pub use user_service::UserService;
