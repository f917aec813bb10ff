//! Per-client request limiter for the auth endpoints.
//!
//! A keyed governor (GCRA) limiter: each client may burst `max_requests`
//! and then regains one request every `window / max_requests`. State lives
//! in this process only, so behind a load balancer the effective limit is
//! `max_requests * instances`.
//!
//! Clients are keyed by `X-Forwarded-For` / `X-Real-IP`. Those headers are
//! client-controlled unless a trusted reverse proxy overwrites them, so the
//! service must run behind one for the limit to hold.

use std::num::NonZeroU32;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Probability threshold for pruning idle clients (0-255)
/// Value of 25 means ~10% chance (25/256) on each check
const PRUNE_THRESHOLD: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

pub struct RateLimiter {
    /// None when limiting is disabled
    limiter: Option<DefaultKeyedRateLimiter<String>>,
    clock: DefaultClock,
}

impl RateLimiter {
    /// `max_requests == 0` (or a zero window) disables limiting
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let limiter = NonZeroU32::new(max_requests)
            .and_then(|burst| {
                Quota::with_period(window / burst.get()).map(|quota| quota.allow_burst(burst))
            })
            .map(DefaultKeyedRateLimiter::keyed);
        if limiter.is_none() && max_requests > 0 {
            tracing::warn!("Rate limit window is zero, limiting disabled");
        }

        Self {
            limiter,
            clock: DefaultClock::default(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::from_secs(60))
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Count one request for `key`
    pub fn check(&self, key: &str) -> RateDecision {
        let Some(limiter) = &self.limiter else {
            return RateDecision::Allowed;
        };

        if rand::random::<u8>() < PRUNE_THRESHOLD {
            limiter.retain_recent();
        }

        match limiter.check_key(&key.to_string()) {
            Ok(()) => RateDecision::Allowed,
            Err(not_until) => RateDecision::Limited {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }

    /// Number of clients currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }
}

/// Client identity: first `X-Forwarded-For` hop, then `X-Real-IP`
pub fn client_key(headers: &HeaderMap) -> String {
    client_ip(headers).unwrap_or_else(|| "unknown".to_string())
}

pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(request.headers());

    match state.rate_limiter.check(&key) {
        RateDecision::Allowed => next.run(request).await,
        RateDecision::Limited { retry_after } => {
            tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
            ApiError::RateLimited {
                retry_after_secs: retry_after.as_secs_f64().ceil().max(1.0) as u64,
            }
            .into_response()
        }
    }
}
