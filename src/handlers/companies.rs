use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use crate::auth::Recruiter;
use crate::db::companies::{self, Company, CompanyFields};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::extract::{non_blank, ApiPath, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
  #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
  pub name: String,
  #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
  pub description: Option<String>,
  #[validate(url(message = "Website must be a valid URL"))]
  pub website: Option<String>,
  #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
  pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
  #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
  pub name: Option<String>,
  #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
  pub description: Option<String>,
  #[validate(url(message = "Website must be a valid URL"))]
  pub website: Option<String>,
  #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
  pub location: Option<String>,
}

/// GET /api/company - The recruiter's own company
pub async fn get_my_company(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
) -> ApiResult<Json<ApiResponse<Company>>> {
  let conn = try_lock(&state.db)?;
  let company = companies::get_company_by_owner(&conn, auth.id())?
    .ok_or_else(|| ApiError::not_found("Company"))?;
  Ok(Json(ApiResponse::ok(company)))
}

/// POST /api/company
pub async fn create_company(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
  ValidatedJson(req): ValidatedJson<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Company>>)> {
  let name = non_blank(&req.name, "Name")?;

  let conn = try_lock(&state.db)?;
  if companies::get_company_by_owner(&conn, auth.id())?.is_some() {
    return Err(ApiError::conflict("Company already exists"));
  }

  let fields = CompanyFields {
    name: None,
    description: req.description.as_deref(),
    website: req.website.as_deref(),
    location: req.location.as_deref(),
  };
  let id = companies::create_company(&conn, auth.id(), name, &fields)?;
  let company = companies::get_company(&conn, id)?
    .ok_or_else(|| ApiError::internal("Company vanished after insert"))?;

  tracing::info!("User {} created company {}", auth.id(), id);
  Ok((StatusCode::CREATED, Json(ApiResponse::ok(company))))
}

/// PUT /api/company
pub async fn update_company(
  State(state): State<AppState>,
  Recruiter(auth): Recruiter,
  ValidatedJson(req): ValidatedJson<UpdateCompanyRequest>,
) -> ApiResult<Json<ApiResponse<Company>>> {
  let name = req.name.as_deref().map(|n| non_blank(n, "Name")).transpose()?;

  let conn = try_lock(&state.db)?;
  let fields = CompanyFields {
    name,
    description: req.description.as_deref(),
    website: req.website.as_deref(),
    location: req.location.as_deref(),
  };
  if !companies::update_company(&conn, auth.id(), &fields)? {
    return Err(ApiError::not_found("Company"));
  }
  let company = companies::get_company_by_owner(&conn, auth.id())?
    .ok_or_else(|| ApiError::not_found("Company"))?;
  Ok(Json(ApiResponse::ok_with_message(company, "Company updated")))
}

/// GET /api/companies/{id} - Public
pub async fn get_company(
  State(state): State<AppState>,
  ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<Company>>> {
  let conn = try_lock(&state.db)?;
  let company = companies::get_company(&conn, id)?.ok_or_else(|| ApiError::not_found("Company"))?;
  Ok(Json(ApiResponse::ok(company)))
}
