use axum::{
    Json,
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, error};

use crate::ErrorResponse;

/// Replaces any 5xx body (and 413) with a sanitised `ErrorResponse`, so no
/// internal detail reaches the client even from layers that do not use
/// `AppError`.
pub async fn error_handling_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let path = req.uri().path().to_owned();
    let method = req.method().clone();

    let response = next.run(req).await;
    let status = response.status();

    debug!(
        "Request handled: {} {} - Status: {} - Time: {:?}",
        method,
        path,
        status,
        start.elapsed()
    );

    if status == StatusCode::PAYLOAD_TOO_LARGE {
        error!("Request body too large on {} {}", method, path);

        let body = ErrorResponse {
            status: status.to_string(),
            message: "The request body exceeds the maximum allowed size".to_string(),
            code: "PAYLOAD_TOO_LARGE".to_string(),
            details: None,
            help: Some("Please reduce the size of your request and try again".to_string()),
        };
        return (status, Json(body)).into_response();
    }

    if status.is_server_error() {
        error!("Server error occurred on {} {}: {}", method, path, status);

        let body = ErrorResponse {
            status: status.to_string(),
            message: "An internal server error occurred".to_string(),
            code: "SERVER_ERROR".to_string(),
            details: None,
            help: Some(
                "Please try again later or contact support if the issue persists".to_string(),
            ),
        };
        return (status, Json(body)).into_response();
    }

    response
}
