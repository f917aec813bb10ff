//! Turning credentials into sessions and back.
//!
//! A login produces a signed token. In session mode the token also carries
//! a session id, and a row keyed by that id stores the token's hash. A
//! bearer only authenticates while that row is live and the account can
//! still log in.

use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use rusqlite::Connection;

use super::db::{self as auth_db, NewSession, User};
use super::password::sha256_hex;
use super::token::{self, TokenSubject};
use crate::config::{AuthMode, AuthSettings};
use crate::db::LogOnError;
use crate::error::{ApiError, ApiResult};

/// Every api key starts with this
pub const API_KEY_PREFIX: &str = "jb_";

/// Random characters after the prefix
const API_KEY_RANDOM_LEN: usize = 40;

/// Stored (and shown in listings) so a user can tell keys apart
pub const API_KEY_DISPLAY_LEN: usize = 8;

/// Revocation reasons recorded on session rows
pub const REVOKED_LOGOUT: &str = "logout";
pub const REVOKED_LOGOUT_ALL: &str = "logout_all";

/// Generate a new session ID
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    (0..32)
        .map(|_| {
            let idx = rng.random_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

/// Fresh plaintext api key: `jb_` plus 40 alphanumerics
pub fn generate_api_key() -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", API_KEY_PREFIX, random)
}

pub fn api_key_display_prefix(key: &str) -> &str {
    key.get(..API_KEY_DISPLAY_LEN).unwrap_or(key)
}

/// Request metadata recorded with a new session
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        Self {
            user_agent: headers
                .get(axum::http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            ip_address: super::rate_limit::client_ip(headers),
        }
    }
}

/// What a successful login hands back to the client
#[derive(Debug, Clone)]
pub struct StartedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub session_id: Option<String>,
}

/// Issue a token for `user`, recording a session row in session mode
pub fn start_session(
    conn: &Connection,
    settings: &AuthSettings,
    user: &User,
    client: &ClientInfo,
) -> ApiResult<StartedSession> {
    let session_id = match settings.mode {
        AuthMode::Session => Some(generate_session_id()),
        AuthMode::Stateless => None,
    };

    let subject = TokenSubject {
        user_id: user.id,
        email: user.email.clone(),
        role: Some(user.role),
        session_id: session_id.clone(),
    };
    let issued = token::issue(&subject, &settings.jwt_secret, settings.token_ttl)
        .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))?;

    if let Some(id) = &session_id {
        let hash = token::token_hash(&issued.token);
        auth_db::create_session(
            conn,
            &NewSession {
                id,
                user_id: user.id,
                token_hash: &hash,
                user_agent: client.user_agent.as_deref(),
                ip_address: client.ip_address.as_deref(),
                expires_at: issued.expires_at(),
            },
        )?;
        tracing::debug!("Started session {} for user {}", id, user.id);
    }

    Ok(StartedSession {
        expires_at: issued.expires_at(),
        token: issued.token,
        session_id,
    })
}

/// A resolved credential
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    /// None for stateless tokens and api keys
    pub session_id: Option<String>,
}

/// Resolve a bearer token to its user, or `None` if it must be rejected
pub fn authenticate_token(
    conn: &Connection,
    settings: &AuthSettings,
    token: &str,
) -> rusqlite::Result<Option<Authenticated>> {
    let Some(claims) = token::verify(token, &settings.jwt_secret) else {
        return Ok(None);
    };
    let Some(user_id) = claims.user_id() else {
        return Ok(None);
    };
    let now = Utc::now();

    match settings.mode {
        AuthMode::Stateless => {
            let user = auth_db::get_user_by_id(conn, user_id)?;
            Ok(user.map(|user| Authenticated {
                user,
                session_id: None,
            }))
        }
        AuthMode::Session => {
            let Some(session_id) = claims.sid else {
                tracing::debug!("Rejected token without session id");
                return Ok(None);
            };

            let hash = token::token_hash(token);
            let Some(session) = auth_db::find_active_session(conn, &session_id, &hash, now)? else {
                return Ok(None);
            };
            if session.user_id != user_id {
                tracing::warn!("Session {} does not belong to token subject {}", session_id, user_id);
                return Ok(None);
            }

            let Some(user) = auth_db::get_user_by_id(conn, user_id)? else {
                return Ok(None);
            };
            if !user.can_authenticate(now) {
                return Ok(None);
            }

            auth_db::touch_session(conn, &session_id).log_warn("Failed to touch session");
            Ok(Some(Authenticated {
                user,
                session_id: Some(session_id),
            }))
        }
    }
}

/// Resolve a plaintext api key to its owner
pub fn authenticate_api_key(conn: &Connection, key: &str) -> rusqlite::Result<Option<Authenticated>> {
    if !key.starts_with(API_KEY_PREFIX) {
        return Ok(None);
    }

    let Some(api_key) = auth_db::find_active_api_key(conn, &sha256_hex(key.as_bytes()))? else {
        return Ok(None);
    };
    let Some(user) = auth_db::get_user_by_id(conn, api_key.user_id)? else {
        return Ok(None);
    };
    if !user.can_authenticate(Utc::now()) {
        return Ok(None);
    }

    auth_db::touch_api_key(conn, api_key.id).log_warn("Failed to touch api key");
    Ok(Some(Authenticated {
        user,
        session_id: None,
    }))
}
