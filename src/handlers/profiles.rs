use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::profiles::{self, Profile, ProfileFields};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Create and update share one shape; absent fields are left alone on update
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
  #[validate(length(max = 200, message = "Headline must be at most 200 characters"))]
  pub headline: Option<String>,
  #[validate(length(max = 5000, message = "Bio must be at most 5000 characters"))]
  pub bio: Option<String>,
  #[validate(length(max = 50, message = "At most 50 skills"))]
  pub skills: Option<Vec<String>>,
  #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
  pub location: Option<String>,
  #[validate(url(message = "Resume URL must be a valid URL"))]
  pub resume_url: Option<String>,
}

impl ProfileRequest {
  fn fields(&self) -> ProfileFields<'_> {
    ProfileFields {
      headline: self.headline.as_deref(),
      bio: self.bio.as_deref(),
      skills: self.skills.as_deref(),
      location: self.location.as_deref(),
      resume_url: self.resume_url.as_deref(),
    }
  }
}

/// GET /api/profile
pub async fn get_my_profile(
  State(state): State<AppState>,
  auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Profile>>> {
  let conn = try_lock(&state.db)?;
  let profile = profiles::get_profile_by_user(&conn, auth.id())?
    .ok_or_else(|| ApiError::not_found("Profile"))?;
  Ok(Json(ApiResponse::ok(profile)))
}

/// POST /api/profile
pub async fn create_profile(
  State(state): State<AppState>,
  auth: AuthUser,
  ValidatedJson(req): ValidatedJson<ProfileRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Profile>>)> {
  let conn = try_lock(&state.db)?;
  if profiles::get_profile_by_user(&conn, auth.id())?.is_some() {
    return Err(ApiError::conflict("Profile already exists"));
  }

  profiles::create_profile(&conn, auth.id(), &req.fields())?;
  let profile = profiles::get_profile_by_user(&conn, auth.id())?
    .ok_or_else(|| ApiError::internal("Profile vanished after insert"))?;
  Ok((StatusCode::CREATED, Json(ApiResponse::ok(profile))))
}

/// PUT /api/profile
pub async fn update_profile(
  State(state): State<AppState>,
  auth: AuthUser,
  ValidatedJson(req): ValidatedJson<ProfileRequest>,
) -> ApiResult<Json<ApiResponse<Profile>>> {
  let conn = try_lock(&state.db)?;
  if !profiles::update_profile(&conn, auth.id(), &req.fields())? {
    return Err(ApiError::not_found("Profile"));
  }
  let profile = profiles::get_profile_by_user(&conn, auth.id())?
    .ok_or_else(|| ApiError::not_found("Profile"))?;
  Ok(Json(ApiResponse::ok_with_message(profile, "Profile updated")))
}

/// GET /api/profiles/{user_id} - Public
pub async fn get_profile(
  State(state): State<AppState>,
  ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<Profile>>> {
  let conn = try_lock(&state.db)?;
  let profile = profiles::get_profile_by_user(&conn, user_id)?
    .ok_or_else(|| ApiError::not_found("Profile"))?;
  Ok(Json(ApiResponse::ok(profile)))
}
