pub mod api_keys;
pub mod applications;
pub mod companies;
pub mod items;
pub mod jobs;
pub mod profiles;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::db::{try_lock, LogOnError};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
  pub status: &'static str,
  pub version: &'static str,
  pub database: &'static str,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<Health>> {
  let database_ok = try_lock(&state.db)
    .ok()
    .and_then(|conn| {
      conn
        .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .log_warn("Health check query failed")
    })
    .is_some();

  Json(ApiResponse::ok(Health {
    status: if database_ok { "ok" } else { "degraded" },
    version: env!("CARGO_PKG_VERSION"),
    database: if database_ok { "ok" } else { "unavailable" },
  }))
}
