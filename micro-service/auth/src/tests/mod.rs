use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use crate::routes::create_routes;
use app_authentication::{AuthService, InMemoryUserStore};
use app_config::{AppConfig, Argon2Config};
use app_error::{INVALID_CREDENTIALS_MESSAGE, INVALID_TOKEN_MESSAGE};

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.security.jwt.secret = "micro_auth_test_secret".to_string();
    config.server.body_limit = 4 * 1024;
    config.security.password.argon2 = Argon2Config {
        memory: 256,
        iterations: 1,
        parallelism: 1,
    };
    config
}

fn setup_app() -> Router {
    let config = test_config();
    let users = Arc::new(InMemoryUserStore::new());
    let auth_service = Arc::new(AuthService::from_config(&config, users).unwrap());
    create_routes(&config, auth_service)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn register_anna(app: &Router) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            json!({
                "username": "anna",
                "email": "anna@example.com",
                "password": "Password123"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
    body
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_app();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_register_returns_token_and_profile() {
    let app = setup_app();

    let body = register_anna(&app).await;

    assert_eq!(body["user"]["username"], "anna");
    assert_eq!(body["user"]["email"], "anna@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let app = setup_app();
    register_anna(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            json!({
                "username": "anna",
                "email": "other@example.com",
                "password": "Password123"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "RESOURCE_EXISTS");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = setup_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/auth/login", json!({ "password": "Password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_then_me() {
    let app = setup_app();
    let registered = register_anna(&app).await;

    let (status, login) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "anna@example.com", "password": "Password123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let token = login["token"].as_str().unwrap();
    let (status, me) = send(&app, bearer_request("/api/auth/me", token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(me, registered["user"]);
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = setup_app();
    register_anna(&app).await;

    let (wrong_status, wrong_password) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "anna", "password": "Password999" }),
        ),
    )
    .await;
    let (unknown_status, unknown_user) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "nobody", "password": "Password123" }),
        ),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password["message"], INVALID_CREDENTIALS_MESSAGE);
}

#[tokio::test]
async fn test_guarded_routes_reject_missing_and_bad_tokens() {
    let app = setup_app();

    for uri in ["/api/auth/me", "/api/auth/verify"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (missing_status, missing) = send(&app, request).await;
        let (bad_status, bad) = send(&app, bearer_request(uri, "abc.def.ghi")).await;

        assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
        assert_eq!(bad_status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing, bad);
        assert_eq!(missing["ok"], false);
        assert_eq!(missing["status"], 401);
        assert_eq!(missing["message"], INVALID_TOKEN_MESSAGE);
    }
}

#[tokio::test]
async fn test_verify_echoes_claims() {
    let app = setup_app();
    let registered = register_anna(&app).await;
    let token = registered["token"].as_str().unwrap();

    let (status, body) = send(&app, bearer_request("/api/auth/verify", token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["claims"]["sub"], registered["user"]["id"]);
    assert_eq!(body["claims"]["username"], "anna");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = setup_app();
    let payload = "x".repeat(8 * 1024);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = setup_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
}
