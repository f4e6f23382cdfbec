//! # Request Timeout Middleware
//!
//! Wraps every handler on both ports in a fixed deadline so a stalled
//! upstream (database, OPAQUE state machine) can't hold a worker thread
//! indefinitely. Built on `actix_web::middleware::from_fn` plus
//! `tokio::time::timeout` rather than a hand-rolled `Service`/`Transform`
//! pair — the `from_fn` seam is enough for a single cross-cutting deadline
//! and keeps this file to the one thing it does.

use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::Error;

use shared::errors::ApiError;

/// Default per-request deadline for both the user and admin surfaces.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fails the request with `ApiError::ServiceUnavailable` once [`REQUEST_TIMEOUT`]
/// elapses instead of letting the handler run forever.
pub async fn timeout(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    match tokio::time::timeout(REQUEST_TIMEOUT, next.call(req)).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::ServiceUnavailable { service: "request".to_string() }.into()),
    }
}
