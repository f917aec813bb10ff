//! Authentication handlers for register, login, logout and the current account.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::db::{self as auth_db, Session, User};
use super::middleware::AuthUser;
use super::password;
use super::session::{start_session, ClientInfo, StartedSession, REVOKED_LOGOUT, REVOKED_LOGOUT_ALL};
use crate::db::{format_ts, try_lock, LogOnError};
use crate::domain::Role;
use crate::error::{ApiError, ApiResult};
use crate::extract::{non_blank, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Same message for unknown email and wrong password
const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    /// New password; requires `current_password`
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: String,
    pub user: User,
}

impl AuthResponse {
    fn new(started: StartedSession, user: User) -> Self {
        Self {
            token: started.token,
            expires_at: format_ts(started.expires_at),
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    /// The session making this request
    pub current: bool,
}

#[derive(Debug, Serialize)]
pub struct RevokedCount {
    pub revoked: usize,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_with_scheme(state: &AppState, password: &str) -> ApiResult<String> {
    state
        .auth
        .password_scheme
        .hash(password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let email = normalize_email(&req.email);
    let name = non_blank(&req.name, "Name")?;

    // Hash before taking the lock
    let password_hash = hash_with_scheme(&state, &req.password)?;

    let conn = try_lock(&state.db)?;
    if auth_db::email_exists(&conn, &email)? {
        return Err(ApiError::conflict("Email already registered"));
    }

    let user_id = auth_db::create_user(&conn, &email, &password_hash, name, req.role)
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::conflict("Email already registered"),
            other => other,
        })?;
    let user = auth_db::get_user_by_id(&conn, user_id)?
        .ok_or_else(|| ApiError::internal("User vanished after insert"))?;

    let started = start_session(&conn, &state.auth, &user, &ClientInfo::from_headers(&headers))?;
    drop(conn);

    tracing::info!("Registered user {} ({})", user.id, user.role.as_str());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            AuthResponse::new(started, user),
            "Registration successful",
        )),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<AuthResponse>>> {
    let email = normalize_email(&req.email);

    let creds = {
        let conn = try_lock(&state.db)?;
        auth_db::get_user_credentials(&conn, &email)?
    };
    let Some(creds) = creds else {
        tracing::warn!("Login attempt for unknown email");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let now = Utc::now();
    if !creds.user.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }
    if creds.user.is_locked(now) {
        return Err(ApiError::forbidden("Account is locked"));
    }

    // Verify without holding the lock
    let valid = password::verify_password(&req.password, &creds.password_hash);

    let conn = try_lock(&state.db)?;
    if !valid {
        let locked_until = auth_db::record_failed_login(
            &conn,
            creds.user.id,
            creds.failed_login_attempts,
            state.auth.max_failed_logins,
            state.auth.lockout,
        )?;
        match locked_until {
            Some(until) => tracing::warn!("User {} locked until {}", creds.user.id, until),
            None => tracing::warn!("Failed login for user {}", creds.user.id),
        }
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    auth_db::record_successful_login(&conn, creds.user.id)
        .log_warn("Failed to record successful login");
    let user = auth_db::get_user_by_id(&conn, creds.user.id)?.unwrap_or(creds.user);

    let started = start_session(&conn, &state.auth, &user, &ClientInfo::from_headers(&headers))?;
    drop(conn);

    tracing::info!("User {} logged in", user.id);
    Ok(Json(ApiResponse::ok(AuthResponse::new(started, user))))
}

/// POST /api/auth/logout - Revoke the session behind this token
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<()>>> {
    if let Some(session_id) = &auth.session_id {
        let conn = try_lock(&state.db)?;
        auth_db::revoke_session(&conn, session_id, REVOKED_LOGOUT)?;
        tracing::info!("User {} logged out of session {}", auth.id(), session_id);
    }
    Ok(Json(ApiResponse::message("Logged out")))
}

/// POST /api/auth/logout-all - Revoke every live session of this user
pub async fn logout_all(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<RevokedCount>>> {
    let conn = try_lock(&state.db)?;
    let revoked = auth_db::revoke_user_sessions(&conn, auth.id(), REVOKED_LOGOUT_ALL)?;
    tracing::info!("User {} revoked {} sessions", auth.id(), revoked);
    Ok(Json(ApiResponse::ok_with_message(
        RevokedCount { revoked },
        "Logged out of all sessions",
    )))
}

/// GET /api/auth/me
pub async fn me(auth: AuthUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::ok(auth.user))
}

/// PUT /api/auth/me - Change name and/or password
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateMeRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let name = req.name.as_deref().map(|n| non_blank(n, "Name")).transpose()?;

    let new_hash = match &req.password {
        Some(new_password) => {
            let current = req
                .current_password
                .as_deref()
                .ok_or_else(|| ApiError::validation("Current password is required"))?;
            let stored = {
                let conn = try_lock(&state.db)?;
                auth_db::get_password_hash(&conn, auth.id())?
            }
            .ok_or_else(|| ApiError::not_found("User"))?;
            if !password::verify_password(current, &stored) {
                return Err(ApiError::validation("Current password is incorrect"));
            }
            Some(hash_with_scheme(&state, new_password)?)
        }
        None => None,
    };

    let conn = try_lock(&state.db)?;
    auth_db::update_user(&conn, auth.id(), name, new_hash.as_deref())?;
    let user = auth_db::get_user_by_id(&conn, auth.id())?.ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(ApiResponse::ok_with_message(user, "Account updated")))
}

/// GET /api/auth/sessions - Live sessions, newest first
pub async fn sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<SessionView>>>> {
    let conn = try_lock(&state.db)?;
    let sessions = auth_db::list_active_sessions(&conn, auth.id())?
        .into_iter()
        .map(|session| SessionView {
            current: auth.session_id.as_deref() == Some(session.id.as_str()),
            session,
        })
        .collect();
    Ok(Json(ApiResponse::ok(sessions)))
}
