use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use super::jobs::owned_job;
use crate::auth::{JobSeeker, Recruiter};
use crate::db::applications::{self, Application, MyApplication};
use crate::db::{jobs, try_lock};
use crate::domain::ApplicationStatus;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

const ALREADY_APPLIED: &str = "Already applied";

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyRequest {
  pub job_id: i64,
  #[validate(length(max = 5000, message = "Cover letter must be at most 5000 characters"))]
  pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
  pub status: ApplicationStatus,
}

/// POST /api/applications
pub async fn apply(
  State(state): State<AppState>,
  JobSeeker(auth): JobSeeker,
  ValidatedJson(req): ValidatedJson<ApplyRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Application>>)> {
  let conn = try_lock(&state.db)?;

  let job = jobs::get_job(&conn, req.job_id)?.ok_or_else(|| ApiError::not_found("Job"))?;
  if !job.is_active {
    return Err(ApiError::validation("This job is no longer accepting applications"));
  }

  if applications::has_applied(&conn, job.id, auth.id())? {
    return Err(ApiError::conflict(ALREADY_APPLIED));
  }

  // The UNIQUE (job_id, user_id) constraint catches a racing duplicate
  let cover_letter = req.cover_letter.as_deref().map(str::trim).filter(|c| !c.is_empty());
  let id = applications::create_application(&conn, job.id, auth.id(), cover_letter).map_err(|e| {
    match ApiError::from(e) {
      ApiError::Conflict(_) => ApiError::conflict(ALREADY_APPLIED),
      other => other,
    }
  })?;
  let application = applications::get_application(&conn, id)?
    .ok_or_else(|| ApiError::internal("Application vanished after insert"))?;

  tracing::info!("User {} applied to job {}", auth.id(), job.id);
  Ok((
    StatusCode::CREATED,
    Json(ApiResponse::ok_with_message(application, "Application submitted")),
  ))
}

/// GET /api/applications/mine
pub async fn my_applications(
  State(state): State<AppState>,
  JobSeeker(auth): JobSeeker,
) -> ApiResult<Json<ApiResponse<Vec<MyApplication>>>> {
  let conn = try_lock(&state.db)?;
  let mine = applications::list_user_applications(&conn, auth.id())?;
  Ok(Json(ApiResponse::ok(mine)))
}

/// PATCH /api/applications/{id}/status - Only the recruiter owning the job
pub async fn update_status(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
  ApiPath(id): ApiPath<i64>,
  ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> ApiResult<Json<ApiResponse<Application>>> {
  let conn = try_lock(&state.db)?;
  let application = applications::get_application(&conn, id)?
    .ok_or_else(|| ApiError::not_found("Application"))?;
  owned_job(&conn, auth.id(), application.job_id)?;

  applications::update_application_status(&conn, id, req.status)?;
  let application = applications::get_application(&conn, id)?
    .ok_or_else(|| ApiError::not_found("Application"))?;

  tracing::info!("User {} set application {} to {}", auth.id(), id, req.status.as_str());
  Ok(Json(ApiResponse::ok_with_message(application, "Status updated")))
}
