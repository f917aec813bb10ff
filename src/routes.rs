//! Router assembly.

use axum::{
  http::{header, HeaderName, HeaderValue, Method},
  middleware::from_fn_with_state,
  routing::{delete, get, patch, post, put},
  Router,
};
use tower_http::{
  cors::{AllowOrigin, Any, CorsLayer},
  trace::TraceLayer,
};

use crate::auth::{handlers as auth, middleware::API_KEY_HEADER, rate_limit::rate_limit_middleware, require_auth};
use crate::handlers::{self, api_keys, applications, companies, items, jobs, profiles};
use crate::state::AppState;

/// The full API with tracing and CORS layers applied
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
  api(state)
    .layer(cors_layer(cors_origins))
    .layer(TraceLayer::new_for_http())
}

/// All `/api` routes, without the outer layers
pub fn api(state: AppState) -> Router {
  let account = Router::new()
    .route("/logout", post(auth::logout))
    .route("/logout-all", post(auth::logout_all))
    .route("/me", get(auth::me).put(auth::update_me))
    .route("/sessions", get(auth::sessions))
    .route_layer(from_fn_with_state(state.clone(), require_auth));

  // Every auth endpoint is rate limited per client
  let auth_routes = Router::new()
    .route("/register", post(auth::register))
    .route("/login", post(auth::login))
    .merge(account)
    .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware));

  // Anyone can browse
  let public = Router::new()
    .route("/health", get(handlers::health))
    .route("/jobs", get(jobs::list_jobs))
    .route("/jobs/{id}", get(jobs::get_job))
    .route("/companies/{id}", get(companies::get_company))
    .route("/profiles/{user_id}", get(profiles::get_profile));

  // Role checks happen in the Recruiter / JobSeeker extractors
  let protected = Router::new()
    .route("/jobs", post(jobs::create_job))
    .route("/jobs/mine", get(jobs::my_jobs))
    .route("/jobs/{id}", put(jobs::update_job).delete(jobs::delete_job))
    .route("/jobs/{id}/applications", get(jobs::job_applications))
    .route("/applications", post(applications::apply))
    .route("/applications/mine", get(applications::my_applications))
    .route("/applications/{id}/status", patch(applications::update_status))
    .route(
      "/company",
      get(companies::get_my_company)
        .post(companies::create_company)
        .put(companies::update_company),
    )
    .route(
      "/profile",
      get(profiles::get_my_profile)
        .post(profiles::create_profile)
        .put(profiles::update_profile),
    )
    .route("/items", get(items::list_items).post(items::create_item))
    .route(
      "/items/{id}",
      get(items::get_item).put(items::update_item).delete(items::delete_item),
    )
    .route("/api-keys", get(api_keys::list_api_keys).post(api_keys::create_api_key))
    .route("/api-keys/{id}", delete(api_keys::revoke_api_key))
    .route_layer(from_fn_with_state(state.clone(), require_auth));

  Router::new()
    .nest("/api/auth", auth_routes)
    .nest("/api", public.merge(protected))
    .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
  let allow_origin = if origins.is_empty() {
    AllowOrigin::from(Any)
  } else {
    let parsed: Vec<HeaderValue> = origins
      .iter()
      .filter_map(|origin| match HeaderValue::from_str(origin) {
        Ok(value) => Some(value),
        Err(_) => {
          tracing::warn!("Ignoring invalid CORS origin: {}", origin);
          None
        }
      })
      .collect();
    AllowOrigin::list(parsed)
  };

  CorsLayer::new()
    .allow_origin(allow_origin)
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::PATCH,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([
      header::AUTHORIZATION,
      header::CONTENT_TYPE,
      HeaderName::from_static(API_KEY_HEADER),
    ])
}
