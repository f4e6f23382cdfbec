//! # Repository Layer
//!
//! Data access for the logical model in the system overview: users, admins,
//! OPAQUE envelopes and login sessions, OIDC pending-authorization/code rows,
//! sessions, signing keys, zero-knowledge DRK custody, OAuth clients, RBAC,
//! OTP enrollment, audit entries, and settings.
//!
//! ## Design decisions
//!
//! 1. Concrete structs over traits, as the teacher does — `PgPool` clones are
//!    cheap and a trait layer would only exist for tests; `mockall` is used
//!    at the service-test boundary instead where traits are worth it.
//! 2. Single-use rows (OPAQUE login sessions, authorization codes, pending
//!    authorizations) are consumed with `DELETE ... RETURNING *`, so two
//!    concurrent `finish` calls race on the same database row rather than on
//!    an in-process lock — the loser gets zero rows back.
//! 3. Opaque byte columns stay `Vec<u8>` all the way down; nothing in this
//!    layer ever looks inside an OPAQUE record, a wrapped DRK blob, or an
//!    encrypted private JWK.

pub mod admin_repository;
pub mod audit_repository;
pub mod authorization_repository;
pub mod client_repository;
pub mod drk_repository;
pub mod install_repository;
pub mod opaque_repository;
pub mod otp_repository;
pub mod rbac_repository;
pub mod session_repository;
pub mod settings_repository;
pub mod signing_key_repository;
pub mod user_repository;

pub use admin_repository::AdminRepository;
pub use audit_repository::AuditRepository;
pub use authorization_repository::AuthorizationRepository;
pub use client_repository::ClientRepository;
pub use drk_repository::DrkRepository;
pub use install_repository::InstallRepository;
pub use opaque_repository::OpaqueRepository;
pub use otp_repository::OtpRepository;
pub use rbac_repository::RbacRepository;
pub use session_repository::SessionRepository;
pub use settings_repository::SettingsRepository;
pub use signing_key_repository::SigningKeyRepository;
pub use user_repository::UserRepository;
