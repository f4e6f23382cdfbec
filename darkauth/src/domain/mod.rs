//! # Domain Layer
//!
//! Framework-agnostic core: entities mapped to the logical data model
//! (users, admins, OPAQUE envelopes, sessions, OIDC pending-authorization
//! and code rows, signing keys, zero-knowledge DRK custody rows, RBAC,
//! OTP enrollment, audit entries, settings) and the domain events the
//! audit pipeline consumes.
//!
//! | Module     | Purpose                                           |
//! |------------|----------------------------------------------------|
//! | `entities` | Core domain entities mapped to database tables    |
//! | `events`   | Domain events consumed by the audit pipeline      |

pub mod entities;
pub mod events;

pub use entities::*;
