//! # Cryptographic Primitives
//!
//! Pure-function cryptographic building blocks plus the stateful services
//! built on top of them: the key-encryption key (KEK), compact JWE
//! construction for zero-knowledge DRK custody, the JWKS/signing-key
//! representation, and HOTP/TOTP.
//!
//! Nothing in [`primitives`] touches the network or the database — every
//! function here takes bytes and returns bytes (or an error). Statefulness
//! (the KEK's derived key, the current signing key) lives one layer up, in
//! the `darkauth` service crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`primitives`] | base64url, constant-time compare, SHA-256, random bytes |
//! | [`kek`] | Key-encryption-key derivation and at-rest sealing |
//! | [`jwe`] | Compact ECDH-ES + A256GCM JWE helpers for ZK DRK custody |
//! | [`jwks`] | Ed25519 JWK/JWKS representation |
//! | [`totp`] | RFC 6238 TOTP built on RFC 4226 HOTP |

pub mod jwe;
pub mod jwks;
pub mod kek;
pub mod primitives;
pub mod totp;
