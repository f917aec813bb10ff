//! End-to-end tests against the full router on an in-memory database.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use jobboard::auth::RateLimiter;
use jobboard::config::AuthSettings;
use jobboard::auth::db as auth_db;
use jobboard::db::DbPool;
use jobboard::{db, routes, state::AppState};

const PASSWORD: &str = "password123";

/// Server plus a handle on its database for arranging state directly
fn server_and_db(limiter: RateLimiter) -> (TestServer, DbPool) {
    let pool = db::open_in_memory().unwrap();
    let state = AppState::new(pool.clone(), AuthSettings::new("test-secret"), limiter);
    (TestServer::new(routes::api(state)).unwrap(), pool)
}

fn server_with(limiter: RateLimiter) -> TestServer {
    server_and_db(limiter).0
}

fn server() -> TestServer {
    server_with(RateLimiter::disabled())
}

/// Register and return the issued token
async fn register(server: &TestServer, email: &str, role: &str) -> String {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "name": "Test User",
            "role": role,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn login(server: &TestServer, email: &str, password: &str) -> (StatusCode, Value) {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    (response.status_code(), response.json())
}

/// Recruiter with a company, ready to post jobs
async fn recruiter(server: &TestServer, email: &str) -> String {
    let token = register(server, email, "recruiter").await;
    server
        .post("/api/company")
        .authorization_bearer(&token)
        .json(&json!({ "name": format!("{} Inc", email) }))
        .await
        .assert_status(StatusCode::CREATED);
    token
}

async fn post_job(server: &TestServer, token: &str, title: &str) -> i64 {
    let response = server
        .post("/api/jobs")
        .authorization_bearer(token)
        .json(&json!({
            "title": title,
            "description": "Build things",
            "location": "Berlin",
            "job_type": "full_time",
            "level": "mid",
            "salary_min": 50000,
            "salary_max": 70000,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["data"]["id"].as_i64().unwrap()
}

fn api_key_header(key: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-api-key"),
        HeaderValue::from_str(key).unwrap(),
    )
}

#[tokio::test]
async fn test_health() {
    let server = server();
    let response = server.get("/api/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_register_then_login() {
    let server = server();
    register(&server, "alice@example.com", "job_seeker").await;

    let (status, body) = login(&server, "ALICE@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    assert_eq!(body["data"]["user"]["role"], "job_seeker");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let token = body["data"]["token"].as_str().unwrap();
    let me = server.get("/api/auth/me").authorization_bearer(token).await;
    me.assert_status_ok();
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let server = server();
    register(&server, "alice@example.com", "job_seeker").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "email": "alice@example.com",
            "password": PASSWORD,
            "name": "Again",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn test_invalid_body_is_a_validation_error() {
    let server = server();
    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": "nope", "password": "short", "name": "" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let server = server();
    register(&server, "alice@example.com", "job_seeker").await;

    let (status_wrong, body_wrong) = login(&server, "alice@example.com", "wrong-password").await;
    let (status_unknown, body_unknown) = login(&server, "bob@example.com", PASSWORD).await;
    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(body_wrong["message"], body_unknown["message"]);
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let server = server();
    register(&server, "alice@example.com", "job_seeker").await;

    for _ in 0..5 {
        let (status, _) = login(&server, "alice@example.com", "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = login(&server, "alice@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Account is locked");
}

#[tokio::test]
async fn test_missing_and_garbage_tokens_are_unauthorized() {
    let server = server();
    server
        .get("/api/auth/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/auth/me")
        .authorization_bearer("not.a.token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_the_token() {
    let server = server();
    let token = register(&server, "alice@example.com", "job_seeker").await;

    server
        .post("/api/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
    server
        .get("/api/auth/me")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_revokes_every_session() {
    let server = server();
    let first = register(&server, "alice@example.com", "job_seeker").await;
    let (_, body) = login(&server, "alice@example.com", PASSWORD).await;
    let second = body["data"]["token"].as_str().unwrap().to_string();

    let sessions = server.get("/api/auth/sessions").authorization_bearer(&second).await;
    let sessions: Value = sessions.json();
    assert_eq!(sessions["data"].as_array().unwrap().len(), 2);

    let response = server
        .post("/api/auth/logout-all")
        .authorization_bearer(&second)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["revoked"], 2);

    for token in [&first, &second] {
        server
            .get("/api/auth/me")
            .authorization_bearer(token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_change_password_requires_current() {
    let server = server();
    let token = register(&server, "alice@example.com", "job_seeker").await;

    let response = server
        .put("/api/auth/me")
        .authorization_bearer(&token)
        .json(&json!({ "password": "new-password-1" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    server
        .put("/api/auth/me")
        .authorization_bearer(&token)
        .json(&json!({ "password": "new-password-1", "current_password": PASSWORD }))
        .await
        .assert_status_ok();

    let (status, _) = login(&server, "alice@example.com", "new-password-1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let server = server_with(RateLimiter::new(3, Duration::from_secs(60)));

    for _ in 0..3 {
        let (status, _) = login(&server, "nobody@example.com", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Browsing is not limited
    server.get("/api/jobs").await.assert_status_ok();
}

#[tokio::test]
async fn test_role_gates() {
    let server = server();
    let seeker = register(&server, "seeker@example.com", "job_seeker").await;
    let recruiter_token = recruiter(&server, "recruiter@example.com").await;
    let job_id = post_job(&server, &recruiter_token, "Engineer").await;

    let response = server
        .post("/api/jobs")
        .authorization_bearer(&seeker)
        .json(&json!({
            "title": "Nope",
            "description": "x",
            "location": "x",
            "job_type": "contract",
            "level": "entry",
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["message"], "Recruiter access required");

    let response = server
        .post("/api/applications")
        .authorization_bearer(&recruiter_token)
        .json(&json!({ "job_id": job_id }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["message"], "Job seeker access required");
}

#[tokio::test]
async fn test_jobs_listing_pages_and_filters() {
    let server = server();
    let token = recruiter(&server, "recruiter@example.com").await;
    for title in ["Rust Engineer", "Go Engineer", "Designer"] {
        post_job(&server, &token, title).await;
    }

    let page = server.get("/api/jobs?limit=2").await;
    page.assert_status_ok();
    let body: Value = page.json();
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["total_pages"], 2);

    let search: Value = server.get("/api/jobs?search=engineer").await.json();
    assert_eq!(search["data"]["total"], 2);

    let salary: Value = server.get("/api/jobs?salary_min=80000").await.json();
    assert_eq!(salary["data"]["total"], 0);

    server
        .get("/api/jobs?job_type=astronaut")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recruiter_cannot_touch_another_companys_job() {
    let server = server();
    let owner = recruiter(&server, "owner@example.com").await;
    let rival = recruiter(&server, "rival@example.com").await;
    let job_id = post_job(&server, &owner, "Engineer").await;

    server
        .put(&format!("/api/jobs/{}", job_id))
        .authorization_bearer(&rival)
        .json(&json!({ "title": "Hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .delete(&format!("/api/jobs/{}", job_id))
        .authorization_bearer(&rival)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get(&format!("/api/jobs/{}/applications", job_id))
        .authorization_bearer(&rival)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .delete(&format!("/api/jobs/{}", job_id))
        .authorization_bearer(&owner)
        .await
        .assert_status_ok();
    server
        .get(&format!("/api/jobs/{}", job_id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_apply_once_and_review() {
    let server = server();
    let recruiter_token = recruiter(&server, "recruiter@example.com").await;
    let seeker = register(&server, "seeker@example.com", "job_seeker").await;
    let job_id = post_job(&server, &recruiter_token, "Engineer").await;

    let response = server
        .post("/api/applications")
        .authorization_bearer(&seeker)
        .json(&json!({ "job_id": job_id, "cover_letter": "Hire me" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let application_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["status"], "pending");

    let again = server
        .post("/api/applications")
        .authorization_bearer(&seeker)
        .json(&json!({ "job_id": job_id }))
        .await;
    again.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = again.json();
    assert_eq!(body["message"], "Already applied");

    let applicants: Value = server
        .get(&format!("/api/jobs/{}/applications", job_id))
        .authorization_bearer(&recruiter_token)
        .await
        .json();
    assert_eq!(applicants["data"].as_array().unwrap().len(), 1);

    server
        .patch(&format!("/api/applications/{}/status", application_id))
        .authorization_bearer(&recruiter_token)
        .json(&json!({ "status": "accepted" }))
        .await
        .assert_status_ok();

    let mine: Value = server
        .get("/api/applications/mine")
        .authorization_bearer(&seeker)
        .await
        .json();
    assert_eq!(mine["data"][0]["status"], "accepted");
    assert_eq!(mine["data"][0]["job_title"], "Engineer");
}

#[tokio::test]
async fn test_cannot_apply_to_missing_job() {
    let server = server();
    let seeker = register(&server, "seeker@example.com", "job_seeker").await;
    server
        .post("/api/applications")
        .authorization_bearer(&seeker)
        .json(&json!({ "job_id": 999 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_is_public_once_created() {
    let server = server();
    let seeker = register(&server, "seeker@example.com", "job_seeker").await;

    let me: Value = server.get("/api/auth/me").authorization_bearer(&seeker).await.json();
    let user_id = me["data"]["id"].as_i64().unwrap();

    server
        .get(&format!("/api/profiles/{}", user_id))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .post("/api/profile")
        .authorization_bearer(&seeker)
        .json(&json!({ "headline": "Rustacean", "skills": ["rust", "sql"] }))
        .await
        .assert_status(StatusCode::CREATED);

    let profile: Value = server.get(&format!("/api/profiles/{}", user_id)).await.json();
    assert_eq!(profile["data"]["headline"], "Rustacean");
    assert_eq!(profile["data"]["skills"], json!(["rust", "sql"]));

    server
        .post("/api/profile")
        .authorization_bearer(&seeker)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_items_are_owner_only() {
    let server = server();
    let alice = register(&server, "alice@example.com", "job_seeker").await;
    let bob = register(&server, "bob@example.com", "recruiter").await;

    let response = server
        .post("/api/items")
        .authorization_bearer(&alice)
        .json(&json!({ "title": "Notes" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let item_id = body["data"]["id"].as_i64().unwrap();

    server
        .get(&format!("/api/items/{}", item_id))
        .authorization_bearer(&bob)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .delete(&format!("/api/items/{}", item_id))
        .authorization_bearer(&bob)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let bobs: Value = server.get("/api/items").authorization_bearer(&bob).await.json();
    assert_eq!(bobs["data"]["total"], 0);

    server
        .delete(&format!("/api/items/{}", item_id))
        .authorization_bearer(&alice)
        .await
        .assert_status_ok();
    server
        .get(&format!("/api/items/{}", item_id))
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_key_lifecycle() {
    let server = server();
    let token = register(&server, "alice@example.com", "job_seeker").await;

    let response = server
        .post("/api/api-keys")
        .authorization_bearer(&token)
        .json(&json!({ "name": "ci" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let key = body["data"]["key"].as_str().unwrap().to_string();
    let key_id = body["data"]["id"].as_i64().unwrap();
    assert!(key.starts_with("jb_"));

    let listed: Value = server.get("/api/api-keys").authorization_bearer(&token).await.json();
    assert!(listed["data"][0].get("key").is_none());

    let (name, value) = api_key_header(&key);
    let me = server.get("/api/auth/me").add_header(name, value).await;
    me.assert_status_ok();
    let me: Value = me.json();
    assert_eq!(me["data"]["email"], "alice@example.com");

    server
        .delete(&format!("/api/api-keys/{}", key_id))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    let (name, value) = api_key_header(&key);
    server
        .get("/api/auth/me")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disabled_account_cannot_log_in_or_use_its_token() {
    let (server, pool) = server_and_db(RateLimiter::disabled());
    let token = register(&server, "alice@example.com", "job_seeker").await;

    let me: Value = server.get("/api/auth/me").authorization_bearer(&token).await.json();
    let user_id = me["data"]["id"].as_i64().unwrap();
    {
        let conn = pool.lock().unwrap();
        auth_db::set_user_active(&conn, user_id, false).unwrap();
    }

    let (status, body) = login(&server, "alice@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Account is disabled");

    server
        .get("/api/auth/me")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_huge_page_number_leaves_the_service_healthy() {
    let server = server();
    let token = recruiter(&server, "recruiter@example.com").await;
    post_job(&server, &token, "Engineer").await;

    let response = server
        .get("/api/jobs?page=9223372036854775807&limit=100")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["total"], 1);

    let items = server
        .get("/api/items?page=9223372036854775807")
        .authorization_bearer(&token)
        .await;
    items.assert_status_ok();

    let health: Value = server.get("/api/health").await.json();
    assert_eq!(health["data"]["database"], "ok");
    let jobs: Value = server.get("/api/jobs").await.json();
    assert_eq!(jobs["data"]["total"], 1);
}

#[tokio::test]
async fn test_whitespace_only_required_fields_are_rejected() {
    let server = server();
    let token = register(&server, "recruiter@example.com", "recruiter").await;

    let response = server
        .post("/api/company")
        .authorization_bearer(&token)
        .json(&json!({ "name": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Name is required");

    server
        .post("/api/company")
        .authorization_bearer(&token)
        .json(&json!({ "name": "Acme" }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .put("/api/company")
        .authorization_bearer(&token)
        .json(&json!({ "name": "  " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/jobs")
        .authorization_bearer(&token)
        .json(&json!({
            "title": "   ",
            "description": "Build things",
            "location": "Berlin",
            "job_type": "full_time",
            "level": "mid",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Title is required");

    let job_id = post_job(&server, &token, "Engineer").await;
    server
        .put(&format!("/api/jobs/{}", job_id))
        .authorization_bearer(&token)
        .json(&json!({ "location": " " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/items")
        .authorization_bearer(&token)
        .json(&json!({ "title": "\t " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
