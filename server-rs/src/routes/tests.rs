//! Router-level tests. The pool points at a closed port, so every path
//! exercised here either finishes before touching Postgres or depends on the
//! database being unreachable.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::Config;
use crate::middleware::auth::generate_tokens;
use crate::models::user::{UserMetadata, ROLE_ADMIN, ROLE_USER};
use crate::services::fallback_store::CONTACT_MESSAGES;
use crate::{build_router, AppState};

fn test_state() -> AppState {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://postgres@127.0.0.1:1/nil_tracker_test")
        .unwrap();
    AppState::new(Config::for_tests(), pool)
}

fn app(state: &AppState) -> Router {
    build_router(state.clone())
}

fn token_for(email: &str, role: &str, organization_id: Option<Uuid>) -> String {
    let metadata = UserMetadata {
        role: Some(role.to_string()),
        organization: None,
        organization_id,
        name: None,
    };
    generate_tokens(Uuid::new_v4(), email, &metadata, "test-secret", 3600, 86400)
        .unwrap()
        .access_token
}

fn tokens(role: &str, organization_id: Option<Uuid>) -> (String, String) {
    let metadata = UserMetadata {
        role: Some(role.to_string()),
        organization: organization_id.map(|_| "State University".to_string()),
        organization_id,
        name: Some("Casey".to_string()),
    };
    let pair = generate_tokens(
        Uuid::new_v4(),
        "casey@state.edu",
        &metadata,
        "test-secret",
        3600,
        86400,
    )
    .unwrap();
    (pair.access_token, pair.refresh_token)
}

fn member_token() -> String {
    tokens(ROLE_USER, Some(Uuid::new_v4())).0
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    req.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7");
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    req.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let state = test_state();
    let resp = app(&state).oneshot(get("/health", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["postgres"], false);
}

#[tokio::test]
async fn tenant_routes_require_a_bearer_token() {
    let state = test_state();
    let resp = app(&state)
        .oneshot(get("/api/v1/athletes", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "No token provided");

    let resp = app(&state)
        .oneshot(get("/api/v1/payments", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_tokens_cannot_call_the_api() {
    let state = test_state();
    let (_, refresh) = tokens(ROLE_USER, Some(Uuid::new_v4()));
    let resp = app(&state)
        .oneshot(get("/api/v1/athletes", Some(&refresh)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn accounts_without_an_organization_are_forbidden() {
    let state = test_state();
    let (access, _) = tokens(ROLE_USER, None);
    let resp = app(&state)
        .oneshot(get("/api/v1/analytics/equity", Some(&access)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_admins_are_rejected_from_admin_routes() {
    let state = test_state();
    let token = member_token();
    let resp = app(&state)
        .oneshot(get("/api/v1/admin/users", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["error"], "Requires admin role");

    let resp = app(&state)
        .oneshot(get("/api/v1/admin/users", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn organization_admins_cannot_reach_platform_routes() {
    let state = test_state();
    let (org_admin, _) = tokens(ROLE_ADMIN, Some(Uuid::new_v4()));

    for uri in ["/api/v1/admin/demo-requests", "/api/v1/admin/debug/env"] {
        let resp = app(&state).oneshot(get(uri, Some(&org_admin))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body_json(resp).await["error"], "Requires platform operator");
    }

    let resp = app(&state)
        .oneshot(post_json("/api/v1/admin/sports", Some(&org_admin), json!({"name": "Rowing"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn operators_reach_platform_routes() {
    let state = test_state();
    let operator = token_for("ops@niltracker.app", ROLE_USER, None);
    let resp = app(&state)
        .oneshot(get("/api/v1/admin/debug/env", Some(&operator)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["app_env"], "test");
    assert!(body["env"]["OPERATOR_EMAILS"].is_boolean());
}

#[tokio::test]
async fn validation_failures_return_400_before_touching_the_database() {
    let state = test_state();
    let token = member_token();

    let resp = app(&state)
        .oneshot(post_json(
            "/api/v1/payments",
            Some(&token),
            json!({
                "athlete_id": Uuid::new_v4(),
                "amount": 0,
                "date": "2024-03-01",
                "source": "Nike",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Amount must be greater than zero");

    let resp = app(&state)
        .oneshot(post_json(
            "/api/v1/spending-limits",
            Some(&token),
            json!({"sport_id": Uuid::new_v4(), "limit_amount": 5000, "period": "weekly"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app(&state)
        .oneshot(get("/api/v1/analytics/trends?granularity=weekly", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_upload_kind_is_not_found() {
    let state = test_state();
    let token = member_token();
    let resp = app(&state)
        .oneshot(post_json("/api/v1/uploads/coaches", Some(&token), json!([])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app(&state)
        .oneshot(get("/api/v1/uploads/payments/template", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["required"], json!(["athlete_id", "amount", "date", "source"]));
}

#[tokio::test]
async fn demo_request_requires_name_email_and_institution() {
    let state = test_state();
    let resp = app(&state)
        .oneshot(post_json(
            "/api/v1/demo-requests",
            None,
            json!({"name": "Jordan", "email": "jordan@state.edu", "institution": " "}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn demo_request_falls_back_when_database_is_unreachable() {
    let state = test_state();
    let resp = app(&state)
        .oneshot(post_json(
            "/api/v1/demo-requests",
            None,
            json!({
                "name": "Jordan Lee",
                "email": "jordan@state.edu",
                "institution": "State University",
                "message": "Interested in Title IX reporting",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["stored_in"], "fallback");

    let listed = state.demo_requests.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].institution, "State University");
}

#[tokio::test]
async fn contact_is_stored_locally_without_a_mailer() {
    let state = test_state();
    let resp = app(&state)
        .oneshot(post_json(
            "/api/v1/contact",
            None,
            json!({"name": "Riley", "email": "riley@state.edu", "message": "Pricing?"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["delivered"], false);

    let stored: Vec<Value> = state.fallback.list(CONTACT_MESSAGES).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["message"], "Pricing?");
}

#[tokio::test]
async fn public_forms_are_rate_limited() {
    let state = test_state();
    let invalid = json!({"name": "", "email": "", "message": ""});
    for _ in 0..2 {
        let resp = app(&state)
            .oneshot(post_json("/api/v1/contact", None, invalid.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
    let resp = app(&state)
        .oneshot(post_json("/api/v1/contact", None, invalid))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn notifications_need_a_configured_mailer() {
    let state = test_state();
    let token = member_token();

    let resp = app(&state)
        .oneshot(post_json(
            "/api/v1/notifications",
            Some(&token),
            json!({"to": "nobody", "subject": "Hi", "text": "Body"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app(&state)
        .oneshot(post_json(
            "/api/v1/notifications",
            Some(&token),
            json!({"to": "ad@state.edu", "subject": "Limit reached", "text": "Basketball is over budget"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn admin_token_still_needs_a_stored_admin_role() {
    // Token claims say admin but the account cannot be confirmed.
    let state = test_state();
    let (access, _) = tokens(ROLE_ADMIN, Some(Uuid::new_v4()));
    let resp = app(&state)
        .oneshot(get("/api/v1/admin/users", Some(&access)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

fn send(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn signup(router: &Router, organization: &str) -> Value {
    let resp = router
        .clone()
        .oneshot(post_json(
            "/api/v1/auth/signup",
            None,
            json!({
                "email": format!("{}@{}.edu", Uuid::new_v4().simple(), organization.to_lowercase()),
                "password": "correct-horse",
                "name": "Director",
                "organization": organization,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

#[tokio::test]
#[ignore] // Requires a running Postgres at TEST_DATABASE_URL
async fn organization_admins_only_manage_their_own_organization() {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL");
    let pool = PgPoolOptions::new().connect(&url).await.unwrap();
    sqlx::Executor::execute(&pool, include_str!("../../migrations/0001_init.sql"))
        .await
        .unwrap();
    let router = build_router(AppState::new(Config::for_tests(), pool.clone()));

    let alice = signup(&router, "Northfield").await;
    let bob = signup(&router, "Southgate").await;
    let alice_token = alice["access_token"].as_str().unwrap().to_string();
    let bob_id = bob["user"]["id"].as_str().unwrap().to_string();
    let bob_org = bob["user"]["user_metadata"]["organization_id"].clone();

    let resp = router
        .clone()
        .oneshot(get("/api/v1/admin/users", Some(&alice_token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = body_json(resp).await;
    let ids: Vec<&str> = listed["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["id"].as_str())
        .collect();
    assert!(ids.contains(&alice["user"]["id"].as_str().unwrap()));
    assert!(!ids.contains(&bob_id.as_str()));

    let resp = router
        .clone()
        .oneshot(send(
            "POST",
            &format!("/api/v1/admin/users/{bob_id}/toggle-admin"),
            &alice_token,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = router
        .clone()
        .oneshot(send(
            "PUT",
            &format!("/api/v1/admin/users/{bob_id}/role"),
            &alice_token,
            json!({"role": "user"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = router
        .clone()
        .oneshot(send(
            "POST",
            "/api/v1/admin/users",
            &alice_token,
            json!({"email": "intruder@southgate.edu", "organization_id": bob_org, "role": "admin"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let bob_still_admin: bool = sqlx::query_scalar(
        "SELECT user_metadata->>'role' = 'admin' FROM users WHERE id = $1::uuid",
    )
    .bind(&bob_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(bob_still_admin);

    // Renaming rewrites the organization and its members' metadata together.
    let resp = router
        .clone()
        .oneshot(send("PUT", "/api/v1/organization", &alice_token, json!({"name": "Northfield State"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let member_org: Option<String> =
        sqlx::query_scalar("SELECT user_metadata->>'organization' FROM users WHERE id = $1::uuid")
            .bind(alice["user"]["id"].as_str().unwrap())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(member_org.as_deref(), Some("Northfield State"));
}
