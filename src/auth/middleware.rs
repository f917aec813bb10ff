//! Authentication middleware and extractors.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::db::User;
use super::session::{authenticate_api_key, authenticate_token};
use crate::db::try_lock;
use crate::domain::Role;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated request context.
/// Add this as a handler parameter to require authentication.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// Session behind the bearer token, if it has one
    pub session_id: Option<String>,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

/// Resolve the request's credentials. A bearer token takes precedence over an api key.
fn resolve(headers: &HeaderMap, state: &AppState) -> ApiResult<AuthUser> {
    let conn = try_lock(&state.db)?;

    let resolved = if let Some(token) = bearer_token(headers) {
        authenticate_token(&conn, &state.auth, token)?
    } else if let Some(key) = api_key(headers) {
        authenticate_api_key(&conn, key)?
    } else {
        return Err(ApiError::unauthorized());
    };

    resolved
        .map(|auth| AuthUser {
            user: auth.user,
            session_id: auth.session_id,
        })
        .ok_or_else(ApiError::unauthorized)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already resolved by require_auth
        if let Some(auth) = parts.extensions.get::<AuthUser>() {
            return Ok(auth.clone());
        }
        resolve(&parts.headers, state)
    }
}

/// Reject unauthenticated requests with 401 and attach `AuthUser` for handlers
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let auth = resolve(request.headers(), &state)?;
    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}

fn require_role(auth: AuthUser, required: Role) -> ApiResult<AuthUser> {
    if auth.role().grants(required) {
        Ok(auth)
    } else {
        tracing::debug!(
            "User {} ({}) denied: {} role required",
            auth.id(),
            auth.role().as_str(),
            required.as_str()
        );
        Err(ApiError::forbidden(match required {
            Role::Recruiter => "Recruiter access required",
            Role::JobSeeker => "Job seeker access required",
        }))
    }
}

/// Authenticated recruiter; anyone else gets 403
pub struct Recruiter(pub AuthUser);

impl FromRequestParts<AppState> for Recruiter {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        require_role(auth, Role::Recruiter).map(Recruiter)
    }
}

/// Authenticated job seeker; anyone else gets 403
pub struct JobSeeker(pub AuthUser);

impl FromRequestParts<AppState> for JobSeeker {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        require_role(auth, Role::JobSeeker).map(JobSeeker)
    }
}
