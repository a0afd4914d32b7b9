use axum::{
    Extension, Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use app_authentication::{AuthService, AuthServiceTrait};
use app_error::{AppError, AppResult};
use app_middleware::{AuthUser, GuardOutcome};
use app_models::{AuthResponse, LoginInput, RegisterInput, UserProfile};

// Undecodable bodies are a client error, reported through the usual error shape
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        debug!("Rejected request body: {}", rejection.body_text());
        AppError::ValidationError(rejection.body_text())
    })
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    Extension(auth_service): Extension<Arc<AuthService>>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let input = json_body(payload)?;
    let response = auth_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    Extension(auth_service): Extension<Arc<AuthService>>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let input = json_body(payload)?;
    Ok(Json(auth_service.login(input).await?))
}

pub async fn me(
    Extension(auth_service): Extension<Arc<AuthService>>,
    user: AuthUser,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(auth_service.get_user_by_id(user.user_id()).await?))
}

pub async fn verify(user: AuthUser) -> GuardOutcome {
    GuardOutcome::allowed(user.0)
}
