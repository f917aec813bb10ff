//! Accounts, credentials and sessions.

pub mod db;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod token;

pub use middleware::{require_auth, AuthUser, JobSeeker, Recruiter};
pub use rate_limit::RateLimiter;
