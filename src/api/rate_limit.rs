//! Request rate limiting.
//!
//! One fixed window shared by every route: at most `permits` requests are
//! admitted per `window`, excess requests are answered immediately with 429
//! and nothing is queued.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tracing::debug;

use crate::error::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    admitted: u32,
}

#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    permits: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl FixedWindowRateLimiter {
    #[must_use]
    pub fn new(permits: u32, window: Duration) -> Self {
        Self {
            permits,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                admitted: 0,
            }),
        }
    }

    fn check_at(&self, now: Instant) -> RateLimitDecision {
        let mut window = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if now.saturating_duration_since(window.started) >= self.window {
            window.started = now;
            window.admitted = 0;
        }

        if window.admitted < self.permits {
            window.admitted += 1;
            RateLimitDecision::Allowed
        } else {
            RateLimitDecision::Limited
        }
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check(&self) -> RateLimitDecision {
        self.check_at(Instant::now())
    }
}

pub async fn enforce(
    State(limiter): State<Arc<dyn RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited => {
            debug!(path = %request.uri().path(), "Request rate limited");
            ServiceError::RateLimited.into_response()
        }
    }
}
