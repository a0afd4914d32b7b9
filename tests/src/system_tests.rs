use app_authentication::{
    AuthService, AuthServiceTrait, InMemoryUserStore, JwtService, hash_password, verify_password,
};
use app_config::{AppConfig, Argon2Config, AuthSecret};
use app_middleware::GuardOutcome;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use micro_auth::routes::create_routes;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    jwt: Arc<JwtService>,
}

// Helper function to create a test app instance
fn setup_test_app() -> TestApp {
    let mut config = AppConfig::default();
    config.security.jwt.secret = "test_secret_key_for_system_testing_only".to_string();
    config.security.password.argon2 = Argon2Config {
        memory: 256,
        iterations: 1,
        parallelism: 1,
    };
    // Plenty of room for the concurrent login scenario
    config.security.rate_limiting.login.max_attempts = 100;

    let users = Arc::new(InMemoryUserStore::new());
    let auth_service = Arc::new(AuthService::from_config(&config, users).unwrap());
    let jwt = auth_service.jwt_service();

    TestApp {
        router: create_routes(&config, auth_service),
        jwt,
    }
}

async fn make_request(
    app: &Router,
    method: Method,
    path: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn register(app: &Router, username: &str) -> Value {
    let (status, body) = make_request(
        app,
        Method::POST,
        "/api/auth/register",
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "Password123"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body
}

#[tokio::test]
async fn test_register_login_and_access_protected_route() {
    let app = setup_test_app();
    let registered = register(&app.router, "chef").await;

    let (status, login) = make_request(
        &app.router,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "username": "chef", "password": "Password123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"], registered["user"]);

    let token = login["token"].as_str().unwrap();
    let (status, me) = make_request(&app.router, Method::GET, "/api/auth/me", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], registered["user"]["id"]);

    let (status, verify) =
        make_request(&app.router, Method::GET, "/api/auth/verify", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: GuardOutcome = serde_json::from_value(verify).unwrap();
    assert!(outcome.ok);
    assert_eq!(outcome.claims.unwrap().sub, me["id"].as_str().unwrap());
}

#[tokio::test]
async fn test_protected_route_without_header() {
    let app = setup_test_app();

    let (status, body) = make_request(&app.router, Method::GET, "/api/auth/me", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_tampered_and_expired_tokens_look_the_same() {
    let app = setup_test_app();
    let registered = register(&app.router, "chef").await;
    let user_id = registered["user"]["id"].as_str().unwrap();

    let token = registered["token"].as_str().unwrap();
    let (head, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { "B" } else { "A" };
    let tampered = format!("{}.{}{}", head, flipped, &signature[1..]);

    let expired = app
        .jwt
        .issue_token_at(user_id, "chef", Utc::now() - Duration::hours(25))
        .unwrap();

    let (tampered_status, tampered_body) =
        make_request(&app.router, Method::GET, "/api/auth/me", None, Some(&tampered)).await;
    let (expired_status, expired_body) =
        make_request(&app.router, Method::GET, "/api/auth/me", None, Some(&expired)).await;

    assert_eq!(tampered_status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired_status, StatusCode::UNAUTHORIZED);
    assert_eq!(tampered_body, expired_body);
}

#[tokio::test]
async fn test_token_from_another_deployment_is_rejected() {
    let app = setup_test_app();
    let registered = register(&app.router, "chef").await;
    let user_id = registered["user"]["id"].as_str().unwrap();

    let other = JwtService::new(&AuthSecret::new("another-deployment").unwrap(), 24);
    let foreign = other.issue_token(user_id, "chef").unwrap();

    let (status, _) =
        make_request(&app.router, Method::GET, "/api/auth/me", None, Some(&foreign)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_concurrent_logins_all_succeed() {
    let app = setup_test_app();
    register(&app.router, "chef").await;

    let logins = (0..8).map(|_| {
        make_request(
            &app.router,
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "chef", "password": "Password123" })),
            None,
        )
    });
    let results = futures::future::join_all(logins).await;

    for (status, body) in results {
        assert_eq!(status, StatusCode::OK);
        let claims = app.jwt.verify_token(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.username, "chef");
    }
}

#[tokio::test]
async fn test_repeated_bad_passwords_lock_the_account() {
    let mut config = AppConfig::default();
    config.security.jwt.secret = "lockout_secret".to_string();
    config.security.password.argon2 = Argon2Config {
        memory: 256,
        iterations: 1,
        parallelism: 1,
    };
    config.security.rate_limiting.login.max_attempts = 3;
    let auth_service =
        Arc::new(AuthService::from_config(&config, Arc::new(InMemoryUserStore::new())).unwrap());
    let router = create_routes(&config, auth_service);
    register(&router, "chef").await;

    let bad_login = json!({ "username": "chef", "password": "WrongPass1" });
    for _ in 0..3 {
        let (status, _) =
            make_request(&router, Method::POST, "/api/auth/login", Some(bad_login.clone()), None)
                .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = make_request(
        &router,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "username": "chef", "password": "Password123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMIT");
}

#[test]
fn test_hashes_are_salted_and_verifiable() {
    let first = hash_password("Tomato-Soup-1").unwrap();
    let second = hash_password("Tomato-Soup-1").unwrap();

    assert_ne!(first, second);
    assert!(first.starts_with("$argon2id$"));
    assert!(verify_password("Tomato-Soup-1", &first));
    assert!(verify_password("Tomato-Soup-1", &second));
    assert!(!verify_password("Tomato-Soup-2", &first));
    assert!(!verify_password("Tomato-Soup-1", "not-a-phc-string"));
}
