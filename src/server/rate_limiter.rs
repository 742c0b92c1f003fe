//! Rate limiting middleware for the HTTP API
//!
//! Token bucket per endpoint category:
//! - General reads: api_rate_limit (default 50/s)
//! - Forced refreshes: refresh_rate_limit (default 1/s), each one hits the broker

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate limit type for different endpoint categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitType {
    /// Dashboard, JSON snapshot, diagnostics
    General,
    /// Forced poll cycles
    Refresh,
}

impl RateLimitType {
    fn as_str(&self) -> &'static str {
        match self {
            RateLimitType::General => "general",
            RateLimitType::Refresh => "refresh",
        }
    }
}

/// Token bucket rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket; a zero rate is treated as one per second
    pub fn new(rate_per_second: u32) -> Self {
        let rate = rate_per_second.max(1) as f64;
        Self {
            capacity: rate,
            tokens: rate,
            refill_rate: rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Try to consume a token, returns true if allowed
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Get time until a token will be available
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// Shared rate limiter state
#[derive(Debug)]
pub struct RateLimiterState {
    limiters: Mutex<HashMap<RateLimitType, TokenBucket>>,
}

impl RateLimiterState {
    pub fn new(api_rate: u32, refresh_rate: u32) -> Self {
        let mut limiters = HashMap::new();
        limiters.insert(RateLimitType::General, TokenBucket::new(api_rate));
        limiters.insert(RateLimitType::Refresh, TokenBucket::new(refresh_rate));

        Self {
            limiters: Mutex::new(limiters),
        }
    }

    /// Try to acquire a token, returning the wait time when exhausted
    pub fn check(&self, rate_type: RateLimitType) -> Result<(), Duration> {
        let mut limiters = self.limiters.lock();
        match limiters.get_mut(&rate_type) {
            Some(limiter) => {
                if limiter.try_acquire() {
                    Ok(())
                } else {
                    Err(limiter.time_until_available())
                }
            }
            None => Ok(()),
        }
    }
}

/// Determine rate limit type based on request path
pub fn get_rate_limit_type(path: &str) -> RateLimitType {
    if path.starts_with("/api/v1/refresh") {
        RateLimitType::Refresh
    } else {
        RateLimitType::General
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let rate_type = get_rate_limit_type(request.uri().path());

    if let Err(wait_time) = state.check(rate_type) {
        tracing::warn!(
            "Rate limit exceeded for {:?}, path: {}, retry after {}ms",
            rate_type,
            request.uri().path(),
            wait_time.as_millis()
        );
        return rate_limit_response(wait_time, rate_type);
    }

    next.run(request).await
}

fn rate_limit_response(retry_after: Duration, rate_type: RateLimitType) -> Response {
    let retry_seconds = (retry_after.as_secs_f64().ceil() as u64).max(1);

    let body = Json(json!({
        "status": "error",
        "error_type": "rate_limit_exceeded",
        "message": format!(
            "Rate limit exceeded for {} requests. Please retry after {} seconds.",
            rate_type.as_str(),
            retry_seconds
        ),
        "retry_after_ms": retry_after.as_millis() as u64
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    let headers = response.headers_mut();
    headers.insert("Retry-After", HeaderValue::from(retry_seconds));
    headers.insert("X-RateLimit-Type", HeaderValue::from_static(rate_type.as_str()));

    response
}
