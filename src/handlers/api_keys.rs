use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::db::{self as auth_db, ApiKey};
use crate::auth::password::sha256_hex;
use crate::auth::session::{api_key_display_prefix, generate_api_key};
use crate::auth::AuthUser;
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::extract::{non_blank, ApiPath, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
  #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
  pub name: String,
}

/// The only response that ever carries the plaintext key
#[derive(Debug, Serialize)]
pub struct CreatedApiKey {
  pub key: String,
  #[serde(flatten)]
  pub api_key: ApiKey,
}

/// GET /api/api-keys
pub async fn list_api_keys(
  State(state): State<AppState>,
  auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<ApiKey>>>> {
  let conn = try_lock(&state.db)?;
  let keys = auth_db::list_api_keys(&conn, auth.id())?;
  Ok(Json(ApiResponse::ok(keys)))
}

/// POST /api/api-keys
pub async fn create_api_key(
  State(state): State<AppState>,
  auth: AuthUser,
  ValidatedJson(req): ValidatedJson<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CreatedApiKey>>)> {
  let name = non_blank(&req.name, "Name")?;
  let key = generate_api_key();
  let hash = sha256_hex(key.as_bytes());

  let conn = try_lock(&state.db)?;
  let id = auth_db::create_api_key(
    &conn,
    auth.id(),
    name,
    api_key_display_prefix(&key),
    &hash,
  )?;
  let api_key = auth_db::get_api_key(&conn, id)?
    .ok_or_else(|| ApiError::internal("API key vanished after insert"))?;

  tracing::info!("User {} created api key {}", auth.id(), id);
  Ok((
    StatusCode::CREATED,
    Json(ApiResponse::ok_with_message(
      CreatedApiKey { key, api_key },
      "Store this key now, it will not be shown again",
    )),
  ))
}

/// DELETE /api/api-keys/{id} - Soft revoke
pub async fn revoke_api_key(
  State(state): State<AppState>,
  auth: AuthUser,
  ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<()>>> {
  let conn = try_lock(&state.db)?;
  if !auth_db::revoke_api_key(&conn, id, auth.id())? {
    return Err(ApiError::not_found("API key"));
  }
  tracing::info!("User {} revoked api key {}", auth.id(), id);
  Ok(Json(ApiResponse::message("API key revoked")))
}
