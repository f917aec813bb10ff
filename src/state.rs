//! Application state shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::rate_limit::RateLimiter;
use crate::config::{AuthSettings, Config};
use crate::db::DbPool;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database (users, sessions, job board tables)
    pub db: DbPool,

    /// Secret, token lifetime, auth mode and lockout policy
    pub auth: Arc<AuthSettings>,

    /// Per-client limiter for the auth endpoints
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(db: DbPool, auth: AuthSettings, rate_limiter: RateLimiter) -> Self {
        Self {
            db,
            auth: Arc::new(auth),
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    pub fn from_config(db: DbPool, config: &Config) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        );
        Self::new(db, config.auth.clone(), limiter)
    }
}
