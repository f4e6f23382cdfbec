//! # Rate Limiter
//!
//! In-process token-bucket keyed by `(endpoint class, caller key)`
//! (component #7). The teacher's equivalent was Redis-backed; this process
//! runs as a single instance per deployment unit, so a sharded in-memory map
//! (`dashmap`) replaces it without losing per-shard concurrency.

use dashmap::DashMap;
use shared::errors::ApiError;
use std::time::{Duration, Instant};

/// Rate-limit class, one row per entry in the defaults table (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitClass {
    Opaque,
    OpaqueFinish,
    Token,
    AdminSensitive,
}

impl RateLimitClass {
    fn defaults(self) -> (u32, u32) {
        match self {
            // (capacity, refill-per-minute)
            Self::Opaque => (20, 10),
            Self::OpaqueFinish => (20, 20),
            Self::Token => (60, 60),
            Self::AdminSensitive => (30, 30),
        }
    }
}

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_second: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: u32, refill_per_minute: u32) -> Self {
        Self {
            tokens: capacity as f64,
            capacity: capacity as f64,
            refill_per_second: refill_per_minute as f64 / 60.0,
            last_refill: Instant::now(),
        }
    }

    /// Refills proportionally to elapsed time, then attempts to take one
    /// token. Returns the retry-after seconds on exhaustion.
    fn try_take(&mut self) -> Result<(), u64> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            let seconds = (deficit / self.refill_per_second).ceil().max(1.0) as u64;
            Err(seconds)
        }
    }
}

/// Sharded by DashMap's own internal sharding; a single mutex per bucket
/// (not per class) keeps contention local to one (class, key) pair.
#[derive(Clone, Default)]
pub struct RateLimiter {
    buckets: std::sync::Arc<DashMap<(RateLimitClass, String), Bucket>>,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { buckets: std::sync::Arc::new(DashMap::new()), enabled }
    }

    pub fn check(&self, class: RateLimitClass, key: &str) -> Result<(), ApiError> {
        if !self.enabled {
            return Ok(());
        }

        let (capacity, refill) = class.defaults();
        let mut entry = self
            .buckets
            .entry((class, key.to_string()))
            .or_insert_with(|| Bucket::new(capacity, refill));

        entry.try_take().map_err(|retry_after_seconds| ApiError::RateLimited { retry_after_seconds })
    }

    /// Drops buckets untouched for a while, so long-running processes don't
    /// accumulate one entry per distinct IP/session forever.
    pub fn sweep_idle(&self, idle_for: Duration) {
        self.buckets.retain(|_, bucket| bucket.last_refill.elapsed() < idle_for);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_limiter_never_rejects() {
        let limiter = RateLimiter::new(false);
        for _ in 0..1000 {
            assert!(limiter.check(RateLimitClass::Opaque, "1.2.3.4").is_ok());
        }
    }

    #[test]
    fn test_bucket_exhausts_after_capacity() {
        let limiter = RateLimiter::new(true);
        let mut rejected = false;
        for _ in 0..25 {
            if limiter.check(RateLimitClass::Opaque, "1.2.3.4").is_err() {
                rejected = true;
            }
        }
        assert!(rejected, "opaque bucket (capacity 20) should reject by request 21");
    }

    #[test]
    fn test_distinct_keys_have_independent_buckets() {
        let limiter = RateLimiter::new(true);
        for _ in 0..20 {
            assert!(limiter.check(RateLimitClass::Opaque, "key-a").is_ok());
        }
        assert!(limiter.check(RateLimitClass::Opaque, "key-b").is_ok());
    }

    #[test]
    fn test_rate_limited_error_carries_retry_after() {
        let limiter = RateLimiter::new(true);
        for _ in 0..20 {
            let _ = limiter.check(RateLimitClass::Opaque, "key-c");
        }
        match limiter.check(RateLimitClass::Opaque, "key-c") {
            Err(ApiError::RateLimited { retry_after_seconds }) => assert!(retry_after_seconds >= 1),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }
}
