//! Auth database operations (users, sessions, api_keys tables).
//!
//! Sessions and api keys are never deleted. Revocation stamps `revoked_at`
//! (sessions also record a reason) and every lookup filters on it.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use crate::db::{enum_column, format_ts, now_ts, parse_ts};
use crate::domain::Role;

const USER_COLUMNS: &str =
    "id, email, name, role, is_active, locked_until, created_at, updated_at, last_login_at";

/// Account as exposed to handlers (never carries the password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub locked_until: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

impl User {
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            role: enum_column(row, 3, Role::from_str)?,
            is_active: row.get(4)?,
            locked_until: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            last_login_at: row.get(8)?,
        })
    }

    /// Whether a lockout is still in force at `now`
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until
            .as_deref()
            .and_then(parse_ts)
            .is_some_and(|until| until > now)
    }

    /// Active and not locked: the only state in which credentials resolve
    pub fn can_authenticate(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_locked(now)
    }
}

/// User row plus the columns only the login path needs
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
    pub failed_login_attempts: i64,
}

/// Create a new user, returns the user ID
pub fn create_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    name: &str,
    role: Role,
) -> Result<i64> {
    let now = now_ts();
    conn.execute(
        r#"INSERT INTO users (email, password_hash, name, role, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)"#,
        params![email, password_hash, name, role.as_str(), now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![user_id],
        User::from_row,
    )
    .optional()
}

/// Look up a user for login, email match is case-insensitive
pub fn get_user_credentials(conn: &Connection, email: &str) -> Result<Option<UserCredentials>> {
    conn.query_row(
        &format!(
            "SELECT {}, password_hash, failed_login_attempts FROM users WHERE email = ?1",
            USER_COLUMNS
        ),
        params![email],
        |row| {
            Ok(UserCredentials {
                user: User::from_row(row)?,
                password_hash: row.get(9)?,
                failed_login_attempts: row.get(10)?,
            })
        },
    )
    .optional()
}

/// Get the stored password hash for a user
pub fn get_password_hash(conn: &Connection, user_id: i64) -> Result<Option<String>> {
    conn.query_row(
        "SELECT password_hash FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()
}

/// Check if an email is already registered
pub fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Update the mutable account fields; `None` leaves a field unchanged
pub fn update_user(
    conn: &Connection,
    user_id: i64,
    name: Option<&str>,
    password_hash: Option<&str>,
) -> Result<()> {
    conn.execute(
        r#"UPDATE users
           SET name = COALESCE(?1, name),
               password_hash = COALESCE(?2, password_hash),
               updated_at = ?3
           WHERE id = ?4"#,
        params![name, password_hash, now_ts(), user_id],
    )?;
    Ok(())
}

/// Enable or disable an account
pub fn set_user_active(conn: &Connection, user_id: i64, active: bool) -> Result<()> {
    conn.execute(
        "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
        params![active, now_ts(), user_id],
    )?;
    Ok(())
}

/// Count a failed login; once `max_attempts` is reached the account is locked
/// for `lock_for`. Returns the lock expiry when this attempt triggered a lock.
pub fn record_failed_login(
    conn: &Connection,
    user_id: i64,
    attempts_so_far: i64,
    max_attempts: i64,
    lock_for: Duration,
) -> Result<Option<String>> {
    let attempts = attempts_so_far + 1;
    let locked_until = (attempts >= max_attempts).then(|| format_ts(Utc::now() + lock_for));

    conn.execute(
        r#"UPDATE users
           SET failed_login_attempts = ?1,
               locked_until = COALESCE(?2, locked_until)
           WHERE id = ?3"#,
        params![if locked_until.is_some() { 0 } else { attempts }, locked_until, user_id],
    )?;
    Ok(locked_until)
}

/// Reset the failure counter and stamp the login time
pub fn record_successful_login(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute(
        r#"UPDATE users
           SET failed_login_attempts = 0, locked_until = NULL, last_login_at = ?1
           WHERE id = ?2"#,
        params![now_ts(), user_id],
    )?;
    Ok(())
}

// ============================================================================
// Sessions
// ============================================================================

const SESSION_COLUMNS: &str = "id, user_id, user_agent, ip_address, created_at, expires_at, \
                               last_activity_at, revoked_at, revoked_reason";

/// One login. The token hash is deliberately not part of this struct.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
    pub expires_at: String,
    pub last_activity_at: String,
    pub revoked_at: Option<String>,
    pub revoked_reason: Option<String>,
}

impl Session {
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            user_agent: row.get(2)?,
            ip_address: row.get(3)?,
            created_at: row.get(4)?,
            expires_at: row.get(5)?,
            last_activity_at: row.get(6)?,
            revoked_at: row.get(7)?,
            revoked_reason: row.get(8)?,
        })
    }
}

pub struct NewSession<'a> {
    pub id: &'a str,
    pub user_id: i64,
    pub token_hash: &'a str,
    pub user_agent: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub expires_at: DateTime<Utc>,
}

/// Create a new session
pub fn create_session(conn: &Connection, session: &NewSession<'_>) -> Result<()> {
    let now = now_ts();
    conn.execute(
        r#"INSERT INTO sessions
           (id, user_id, token_hash, user_agent, ip_address, created_at, expires_at, last_activity_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6)"#,
        params![
            session.id,
            session.user_id,
            session.token_hash,
            session.user_agent,
            session.ip_address,
            now,
            format_ts(session.expires_at),
        ],
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
    conn.query_row(
        &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
        params![session_id],
        Session::from_row,
    )
    .optional()
}

/// The session matching both id and token hash, if neither revoked nor expired at `now`
pub fn find_active_session(
    conn: &Connection,
    session_id: &str,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>> {
    conn.query_row(
        &format!(
            r#"SELECT {} FROM sessions
               WHERE id = ?1 AND token_hash = ?2 AND revoked_at IS NULL AND expires_at > ?3"#,
            SESSION_COLUMNS
        ),
        params![session_id, token_hash, format_ts(now)],
        Session::from_row,
    )
    .optional()
}

/// Update last activity time
pub fn touch_session(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET last_activity_at = ?1 WHERE id = ?2",
        params![now_ts(), session_id],
    )?;
    Ok(())
}

/// Revoke one session (logout). Returns false if it was already revoked or unknown.
pub fn revoke_session(conn: &Connection, session_id: &str, reason: &str) -> Result<bool> {
    let changed = conn.execute(
        r#"UPDATE sessions SET revoked_at = ?1, revoked_reason = ?2
           WHERE id = ?3 AND revoked_at IS NULL"#,
        params![now_ts(), reason, session_id],
    )?;
    Ok(changed > 0)
}

/// Revoke all of a user's live sessions, returns how many were revoked
pub fn revoke_user_sessions(conn: &Connection, user_id: i64, reason: &str) -> Result<usize> {
    conn.execute(
        r#"UPDATE sessions SET revoked_at = ?1, revoked_reason = ?2
           WHERE user_id = ?3 AND revoked_at IS NULL"#,
        params![now_ts(), reason, user_id],
    )
}

/// Sessions that would still validate, newest first
pub fn list_active_sessions(conn: &Connection, user_id: i64) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(&format!(
        r#"SELECT {} FROM sessions
           WHERE user_id = ?1 AND revoked_at IS NULL AND expires_at > ?2
           ORDER BY created_at DESC, id"#,
        SESSION_COLUMNS
    ))?;
    let sessions = stmt
        .query_map(params![user_id, now_ts()], Session::from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(sessions)
}

// ============================================================================
// API keys
// ============================================================================

const API_KEY_COLUMNS: &str = "id, user_id, name, key_prefix, created_at, last_used_at, revoked_at";

#[derive(Debug, Clone, Serialize)]
pub struct ApiKey {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub key_prefix: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub revoked_at: Option<String>,
}

impl ApiKey {
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            key_prefix: row.get(3)?,
            created_at: row.get(4)?,
            last_used_at: row.get(5)?,
            revoked_at: row.get(6)?,
        })
    }
}

/// Store a new api key by hash, returns its ID
pub fn create_api_key(
    conn: &Connection,
    user_id: i64,
    name: &str,
    key_prefix: &str,
    key_hash: &str,
) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO api_keys (user_id, name, key_prefix, key_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
        params![user_id, name, key_prefix, key_hash, now_ts()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_api_key(conn: &Connection, key_id: i64) -> Result<Option<ApiKey>> {
    conn.query_row(
        &format!("SELECT {} FROM api_keys WHERE id = ?1", API_KEY_COLUMNS),
        params![key_id],
        ApiKey::from_row,
    )
    .optional()
}

pub fn list_api_keys(conn: &Connection, user_id: i64) -> Result<Vec<ApiKey>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM api_keys WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        API_KEY_COLUMNS
    ))?;
    let keys = stmt
        .query_map(params![user_id], ApiKey::from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(keys)
}

/// Unrevoked key with this hash
pub fn find_active_api_key(conn: &Connection, key_hash: &str) -> Result<Option<ApiKey>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM api_keys WHERE key_hash = ?1 AND revoked_at IS NULL",
            API_KEY_COLUMNS
        ),
        params![key_hash],
        ApiKey::from_row,
    )
    .optional()
}

pub fn touch_api_key(conn: &Connection, key_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE api_keys SET last_used_at = ?1 WHERE id = ?2",
        params![now_ts(), key_id],
    )?;
    Ok(())
}

/// Revoke a key owned by `user_id`. Returns false if no live key matched.
pub fn revoke_api_key(conn: &Connection, key_id: i64, user_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE api_keys SET revoked_at = ?1 WHERE id = ?2 AND user_id = ?3 AND revoked_at IS NULL",
        params![now_ts(), key_id, user_id],
    )?;
    Ok(changed > 0)
}
