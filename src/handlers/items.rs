use axum::{extract::State, http::StatusCode, Json};
use rusqlite::Connection;
use serde::Deserialize;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::items::{self, Item, ItemChanges, ItemFilter};
use crate::db::try_lock;
use crate::domain::{ItemSort, ItemStatus, SortOrder};
use crate::error::{ApiError, ApiResult};
use crate::extract::{non_blank, ApiPath, ApiQuery, ValidatedJson};
use crate::response::{ApiResponse, Page, PageParams};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
  pub search: Option<String>,
  pub status: Option<ItemStatus>,
  pub sort: Option<ItemSort>,
  pub order: Option<SortOrder>,
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
  #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
  pub title: String,
  #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
  pub description: Option<String>,
  #[serde(default)]
  pub status: ItemStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
  #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
  pub title: Option<String>,
  #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
  pub description: Option<String>,
  pub status: Option<ItemStatus>,
}

/// Load an item the caller owns: 404 if missing, 403 if someone else's
fn owned_item(conn: &Connection, user_id: i64, id: i64) -> ApiResult<Item> {
  let item = items::get_item(conn, id)?.ok_or_else(|| ApiError::not_found("Item"))?;
  if item.owner_id != user_id {
    return Err(ApiError::forbidden("You do not own this item"));
  }
  Ok(item)
}

/// GET /api/items
pub async fn list_items(
  State(state): State<AppState>,
  auth: AuthUser,
  ApiQuery(query): ApiQuery<ItemQuery>,
) -> ApiResult<Json<ApiResponse<Page<Item>>>> {
  let page = PageParams {
    page: query.page,
    limit: query.limit,
  };
  let filter = ItemFilter {
    search: query.search,
    status: query.status,
    sort: query.sort.unwrap_or_default(),
    order: query.order.unwrap_or_default(),
  };

  let conn = try_lock(&state.db)?;
  let (found, total) = items::list_items(&conn, auth.id(), &filter, page)?;
  Ok(Json(ApiResponse::ok(Page::new(found, total, page))))
}

/// POST /api/items
pub async fn create_item(
  State(state): State<AppState>,
  auth: AuthUser,
  ValidatedJson(req): ValidatedJson<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Item>>)> {
  let title = non_blank(&req.title, "Title")?;

  let conn = try_lock(&state.db)?;
  let id = items::create_item(
    &conn,
    auth.id(),
    title,
    req.description.as_deref(),
    req.status,
  )?;
  let item = items::get_item(&conn, id)?.ok_or_else(|| ApiError::internal("Item vanished after insert"))?;
  Ok((StatusCode::CREATED, Json(ApiResponse::ok(item))))
}

/// GET /api/items/{id}
pub async fn get_item(
  State(state): State<AppState>,
  auth: AuthUser,
  ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<Item>>> {
  let conn = try_lock(&state.db)?;
  Ok(Json(ApiResponse::ok(owned_item(&conn, auth.id(), id)?)))
}

/// PUT /api/items/{id}
pub async fn update_item(
  State(state): State<AppState>,
  auth: AuthUser,
  ApiPath(id): ApiPath<i64>,
  ValidatedJson(req): ValidatedJson<UpdateItemRequest>,
) -> ApiResult<Json<ApiResponse<Item>>> {
  let title = req.title.as_deref().map(|t| non_blank(t, "Title")).transpose()?;

  let conn = try_lock(&state.db)?;
  owned_item(&conn, auth.id(), id)?;

  let changes = ItemChanges {
    title,
    description: req.description.as_deref(),
    status: req.status,
  };
  items::update_item(&conn, id, &changes)?;
  let item = items::get_item(&conn, id)?.ok_or_else(|| ApiError::not_found("Item"))?;
  Ok(Json(ApiResponse::ok_with_message(item, "Item updated")))
}

/// DELETE /api/items/{id}
pub async fn delete_item(
  State(state): State<AppState>,
  auth: AuthUser,
  ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ApiResponse<()>>> {
  let conn = try_lock(&state.db)?;
  owned_item(&conn, auth.id(), id)?;
  items::delete_item(&conn, id)?;
  Ok(Json(ApiResponse::message("Item deleted")))
}
