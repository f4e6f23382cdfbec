//! # API Layer
//!
//! HTTP request/response processing for both ports this process serves: the
//! user port (discovery, the authorize/token pipeline, OPAQUE, zero-knowledge
//! DRK custody, OTP step-up) and the admin port (admin OPAQUE login plus the
//! console's CRUD). It bridges the HTTP world with the service layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            HTTP Request                                 │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Routes (routes.rs)                             │
//! │  configure_user / configure_admin — one ServiceConfig per port          │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Handlers (handlers.rs)                           │
//! │  1. Extract request data and resolve a Credential                       │
//! │  2. Validate input using DTOs                                           │
//! │  3. Call service layer, record audit entries                            │
//! │  4. Transform response                                                  │
//! └───────────────────────────────┬─────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          DTOs (dto.rs)                                  │
//! │  - Request validation (serde, validator)                                │
//! │  - Response serialization                                               │
//! │  - API contract definitions                                             │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! | Module       | Responsibility                                      |
//! |--------------|-----------------------------------------------------|
//! | `routes`     | Route definitions, one `configure_*` per port       |
//! | `handlers`   | Request handlers (extractors → service → response)  |
//! | `dto`        | Data Transfer Objects for request/response          |
//! | `middleware` | Cross-cutting concerns applied to every route        |
//!
//! ## Related Documentation
//!
//! - Service layer: [`crate::service`]
//! - Error responses: [`shared::errors::ApiError`]
//! - Session/CSRF resolution: [`crate::service::session_service::Credential`]

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
