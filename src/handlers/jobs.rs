use axum::{extract::State, http::StatusCode, Json};
use rusqlite::Connection;
use serde::Deserialize;
use validator::Validate;

use crate::auth::Recruiter;
use crate::db::applications::{self, Applicant};
use crate::db::companies::{self, Company};
use crate::db::jobs::{self, Job, JobChanges, JobFilter, NewJob};
use crate::db::try_lock;
use crate::domain::{ExperienceLevel, JobType};
use crate::error::{ApiError, ApiResult};
use crate::extract::{non_blank, ApiPath, ApiQuery, ValidatedJson};
use crate::response::{ApiResponse, Page, PageParams};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobQuery {
  pub search: Option<String>,
  pub location: Option<String>,
  pub job_type: Option<JobType>,
  pub level: Option<ExperienceLevel>,
  pub salary_min: Option<i64>,
  pub salary_max: Option<i64>,
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

impl JobQuery {
  fn split(self) -> (JobFilter, PageParams) {
    (
      JobFilter {
        search: self.search,
        location: self.location,
        job_type: self.job_type,
        level: self.level,
        salary_min: self.salary_min,
        salary_max: self.salary_max,
      },
      PageParams {
        page: self.page,
        limit: self.limit,
      },
    )
  }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
  #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
  pub title: String,
  #[validate(length(min = 1, max = 10000, message = "Description must be 1-10000 characters"))]
  pub description: String,
  #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
  pub location: String,
  pub job_type: JobType,
  pub level: ExperienceLevel,
  #[validate(range(min = 0, message = "Salary cannot be negative"))]
  pub salary_min: Option<i64>,
  #[validate(range(min = 0, message = "Salary cannot be negative"))]
  pub salary_max: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateJobRequest {
  #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
  pub title: Option<String>,
  #[validate(length(min = 1, max = 10000, message = "Description must be 1-10000 characters"))]
  pub description: Option<String>,
  #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
  pub location: Option<String>,
  pub job_type: Option<JobType>,
  pub level: Option<ExperienceLevel>,
  #[validate(range(min = 0, message = "Salary cannot be negative"))]
  pub salary_min: Option<i64>,
  #[validate(range(min = 0, message = "Salary cannot be negative"))]
  pub salary_max: Option<i64>,
  pub is_active: Option<bool>,
}

fn check_salary_range(min: Option<i64>, max: Option<i64>) -> ApiResult<()> {
  match (min, max) {
    (Some(min), Some(max)) if min > max => Err(ApiError::validation(
      "salary_min cannot be greater than salary_max",
    )),
    _ => Ok(()),
  }
}

/// The recruiter's company, which every job write goes through
fn recruiter_company(conn: &Connection, recruiter_id: i64) -> ApiResult<Company> {
  companies::get_company_by_owner(conn, recruiter_id)?
    .ok_or_else(|| ApiError::validation("Create a company before posting jobs"))
}

/// Load a job, requiring it to belong to the recruiter's company
pub(crate) fn owned_job(conn: &Connection, recruiter_id: i64, job_id: i64) -> ApiResult<Job> {
  let job = jobs::get_job(conn, job_id)?.ok_or_else(|| ApiError::not_found("Job"))?;
  let owns = companies::get_company_by_owner(conn, recruiter_id)?
    .is_some_and(|company| company.id == job.company_id);
  if !owns {
    tracing::warn!("User {} tried to modify job {} of another company", recruiter_id, job_id);
    return Err(ApiError::forbidden("You can only manage your own company's jobs"));
  }
  Ok(job)
}

/// GET /api/jobs - Public, active jobs only
pub async fn list_jobs(
  State(state): State<AppState>,
  ApiQuery(query): ApiQuery<JobQuery>,
) -> ApiResult<Json<ApiResponse<Page<Job>>>> {
  let (filter, page) = query.split();
  let conn = try_lock(&state.db)?;
  let (jobs, total) = jobs::list_jobs(&conn, &filter, page)?;
  Ok(Json(ApiResponse::ok(Page::new(jobs, total, page))))
}

/// GET /api/jobs/{id}
pub async fn get_job(
  State(state): State<AppState>,
  ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<Job>>> {
  let conn = try_lock(&state.db)?;
  let job = jobs::get_job(&conn, id)?.ok_or_else(|| ApiError::not_found("Job"))?;
  Ok(Json(ApiResponse::ok(job)))
}

/// POST /api/jobs
pub async fn create_job(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
  ValidatedJson(req): ValidatedJson<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Job>>)> {
  check_salary_range(req.salary_min, req.salary_max)?;
  let title = non_blank(&req.title, "Title")?;
  let description = non_blank(&req.description, "Description")?;
  let location = non_blank(&req.location, "Location")?;

  let conn = try_lock(&state.db)?;
  let company = recruiter_company(&conn, auth.id())?;
  let id = jobs::create_job(
    &conn,
    company.id,
    auth.id(),
    &NewJob {
      title,
      description,
      location,
      job_type: req.job_type,
      level: req.level,
      salary_min: req.salary_min,
      salary_max: req.salary_max,
    },
  )?;
  let job = jobs::get_job(&conn, id)?.ok_or_else(|| ApiError::internal("Job vanished after insert"))?;

  tracing::info!("User {} posted job {}", auth.id(), id);
  Ok((StatusCode::CREATED, Json(ApiResponse::ok(job))))
}

/// PUT /api/jobs/{id}
pub async fn update_job(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
  ApiPath(id): ApiPath<i64>,
  ValidatedJson(req): ValidatedJson<UpdateJobRequest>,
) -> ApiResult<Json<ApiResponse<Job>>> {
  let title = req.title.as_deref().map(|t| non_blank(t, "Title")).transpose()?;
  let description = req.description.as_deref().map(|d| non_blank(d, "Description")).transpose()?;
  let location = req.location.as_deref().map(|l| non_blank(l, "Location")).transpose()?;

  let conn = try_lock(&state.db)?;
  let current = owned_job(&conn, auth.id(), id)?;
  check_salary_range(
    req.salary_min.or(current.salary_min),
    req.salary_max.or(current.salary_max),
  )?;

  let changes = JobChanges {
    title,
    description,
    location,
    job_type: req.job_type,
    level: req.level,
    salary_min: req.salary_min,
    salary_max: req.salary_max,
    is_active: req.is_active,
  };
  jobs::update_job(&conn, id, &changes)?;
  let job = jobs::get_job(&conn, id)?.ok_or_else(|| ApiError::not_found("Job"))?;
  Ok(Json(ApiResponse::ok_with_message(job, "Job updated")))
}

/// DELETE /api/jobs/{id}
pub async fn delete_job(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
  ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<()>>> {
  let conn = try_lock(&state.db)?;
  owned_job(&conn, auth.id(), id)?;
  jobs::delete_job(&conn, id)?;
  tracing::info!("User {} deleted job {}", auth.id(), id);
  Ok(Json(ApiResponse::message("Job deleted")))
}

/// GET /api/jobs/mine - Every job of the recruiter's company, inactive included
pub async fn my_jobs(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
  ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<Json<ApiResponse<Page<Job>>>> {
  let conn = try_lock(&state.db)?;
  let (jobs, total) = match companies::get_company_by_owner(&conn, auth.id())? {
    Some(company) => jobs::list_company_jobs(&conn, company.id, page)?,
    None => (Vec::new(), 0),
  };
  Ok(Json(ApiResponse::ok(Page::new(jobs, total, page))))
}

/// GET /api/jobs/{id}/applications
pub async fn job_applications(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
  ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<Vec<Applicant>>>> {
  let conn = try_lock(&state.db)?;
  owned_job(&conn, auth.id(), id)?;
  let applicants = applications::list_job_applications(&conn, id)?;
  Ok(Json(ApiResponse::ok(applicants)))
}
