//! # PostgreSQL Connection Pool
//!
//! Database connection management using sqlx's async connection pool.
//!
//! ## Pool Configuration
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `max_connections` | 10 | Maximum connections in pool |
//! | `min_connections` | 1 | Minimum connections to maintain |
//! | `connect_timeout` | 30s | Timeout for acquiring connection |
//! | `max_lifetime` | 30min | Recycle connections after this time |
//!
//! Every row the service layer reads or writes — users, sessions, pending
//! authorizations, signing keys — goes through this single pool; there is no
//! secondary cache, so pool sizing is the only lever for read/write
//! concurrency headroom.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::database::create_pool;
//! use shared::config::AppConfig;
//!
//! let config = AppConfig::from_file(&path)?;
//! let pool = create_pool(&config.postgres_uri, &config.database).await?;
//!
//! shared::database::health_check(&pool).await?;
//! ```

use crate::config::DatabaseConfig;
use crate::errors::ApiError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Creates a PostgreSQL connection pool and validates connectivity.
///
/// Should be called once at application startup, before either HTTP surface
/// starts accepting connections.
///
/// ## Errors
///
/// Returns `ApiError::DatabaseError` if the connection URL is invalid, the
/// database is unreachable, or authentication fails.
pub async fn create_pool(postgres_uri: &str, config: &DatabaseConfig) -> Result<PgPool, ApiError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_seconds = config.connect_timeout_seconds,
        max_lifetime_seconds = config.max_lifetime_seconds,
        "Creating database connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .max_lifetime(Duration::from_secs(config.max_lifetime_seconds))
        .test_before_acquire(true)
        .connect(postgres_uri)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create database pool");
            ApiError::DatabaseError(e)
        })?;

    info!("Database connection pool created successfully");

    Ok(pool)
}

/// Verifies database connectivity via a trivial `SELECT 1`. Used by health
/// check endpoints on both HTTP surfaces.
pub async fn health_check(pool: &PgPool) -> Result<(), ApiError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    // Requires a live Postgres instance; run with `cargo test -- --ignored`.
}
