//! API error type.
//!
//! Every handler returns `ApiResult<T>`; errors render as the same JSON
//! envelope successful responses use, with `success: false`. Database and
//! internal failures are logged and masked from the client.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::{DbLockError, is_unique_violation};
use crate::response::ApiResponse;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or out-of-range request data
    #[error("{0}")]
    Validation(String),

    /// Missing, malformed, expired or revoked credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but wrong role or not the owner
    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate email, duplicate application and similar
    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, try again in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            // Conflicts surface as 400 so clients only branch on the message
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict("Resource already exists".to_string())
        } else {
            Self::Database(err)
        }
    }
}

impl From<DbLockError> for ApiError {
    fn from(err: DbLockError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Database operation failed");
                "Internal server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(ApiResponse::<()>::error(message))).into_response();

        if let Self::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
