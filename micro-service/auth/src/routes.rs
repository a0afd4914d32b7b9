use std::{sync::Arc, time::Duration};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension},
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
};

use crate::handlers::{health_check, login, me, register, verify};
use app_authentication::{AuthService, AuthServiceTrait};
use app_config::{AppConfig, CorsConfig};
use app_error::middleware_handling::error_handling_middleware;
use app_middleware::{
    api_middleware::{logging_middleware, security_headers_middleware},
    protect,
};

fn cors_layer(cors_config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        // "*" anywhere in the list means any origin
        .allow_origin(if cors_config.allowed_origins.iter().any(|o| o == "*") {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(
                cors_config
                    .allowed_origins
                    .iter()
                    .filter_map(|origin| origin.parse().ok())
                    .collect::<Vec<HeaderValue>>(),
            )
        })
        .allow_methods(
            cors_config
                .allowed_methods
                .iter()
                .filter_map(|method| method.parse().ok())
                .collect::<Vec<Method>>(),
        )
        .allow_headers(
            cors_config
                .allowed_headers
                .iter()
                .filter_map(|header| header.parse().ok())
                .collect::<Vec<HeaderName>>(),
        )
}

pub fn create_routes(config: &AppConfig, auth_service: Arc<AuthService>) -> Router {
    let body_limit = config.server.body_limit;
    let timeout = Duration::from_secs(config.server.request_timeout_secs);

    let guarded = protect(
        Router::new()
            .route("/me", get(me))
            .route("/verify", get(verify)),
        auth_service.jwt_service(),
    );

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(guarded);

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .layer(Extension(auth_service));

    // Later layers wrap earlier ones: tracing sees everything, and the error
    // middleware sees the 500 produced by a caught panic
    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(error_handling_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors_layer(&config.security.cors))
        .layer(TraceLayer::new_for_http())
}
