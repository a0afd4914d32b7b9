pub mod middleware_handling;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned for every rejected bearer token, whatever the cause.
pub const INVALID_TOKEN_MESSAGE: &str =
    "Invalid or missing authentication token. Please log in again.";

/// Message returned for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password.";

#[derive(Debug)]
pub enum AppError {
    ConfigError(anyhow::Error),
    ServerError(anyhow::Error),
    ValidationError(String),
    NotFoundError(String),
    AuthenticationError(String),
    RateLimitError(String),
    CryptoError(String),
    ResourceExistsError(String),
}

impl AppError {
    // User-facing authentication errors
    pub fn invalid_credentials() -> Self {
        Self::AuthenticationError(INVALID_CREDENTIALS_MESSAGE.to_string())
    }

    pub fn token_invalid() -> Self {
        Self::AuthenticationError(INVALID_TOKEN_MESSAGE.to_string())
    }

    pub fn account_locked(seconds: u64) -> Self {
        Self::RateLimitError(format!(
            "Too many failed login attempts. Please try again in {} seconds.",
            seconds
        ))
    }

    // Resource errors
    pub fn resource_not_found(resource_type: &str, identifier: &str) -> Self {
        Self::NotFoundError(format!(
            "{} with identifier '{}' was not found.",
            resource_type, identifier
        ))
    }

    pub fn resource_exists(resource_type: &str, field: &str) -> Self {
        Self::ResourceExistsError(format!("{} with this {} already exists.", resource_type, field))
    }

    // Validation errors
    pub fn validation(field: &str, message: &str) -> Self {
        Self::ValidationError(format!("Validation failed for '{}': {}", field, message))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::NotFoundError(_) => StatusCode::NOT_FOUND,
            Self::ResourceExistsError(_) => StatusCode::CONFLICT,
            Self::RateLimitError(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::ConfigError(_)
            | Self::ServerError(_)
            | Self::CryptoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::ServerError(error)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Self::ServerError(e) => write!(f, "Server error: {}", e),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::NotFoundError(msg) => write!(f, "Not found: {}", msg),
            Self::AuthenticationError(msg) => write!(f, "Authentication error: {}", msg),
            Self::RateLimitError(msg) => write!(f, "Rate limit error: {}", msg),
            Self::CryptoError(msg) => write!(f, "Crypto error: {}", msg),
            Self::ResourceExistsError(msg) => write!(f, "Resource exists: {}", msg),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_message, error_code, help_text) = match &self {
            Self::ValidationError(msg) => (
                msg.as_str(),
                "VALIDATION_ERROR",
                Some("Please review your input and try again."),
            ),
            Self::AuthenticationError(msg) => (
                msg.as_str(),
                "AUTH_ERROR",
                Some("Please log in to access this resource."),
            ),
            Self::NotFoundError(msg) => (
                msg.as_str(),
                "NOT_FOUND",
                Some("The requested resource was not found."),
            ),
            Self::ResourceExistsError(msg) => (
                msg.as_str(),
                "RESOURCE_EXISTS",
                Some("Choose a different value and try again."),
            ),
            Self::RateLimitError(msg) => {
                (msg.as_str(), "RATE_LIMIT", Some("Please try again later."))
            }
            Self::ConfigError(_) => ("System configuration error", "CONFIG_ERROR", None),
            Self::CryptoError(_) | Self::ServerError(_) => {
                ("Internal server error", "SERVER_ERROR", None)
            }
        };

        let log_message = format!("[{}] {}: {}", error_code, status, self);
        if status.is_server_error() {
            tracing::error!(error_code = error_code, status_code = %status.as_u16(), "{}", log_message);
        } else {
            tracing::warn!(error_code = error_code, status_code = %status.as_u16(), "{}", log_message);
        }

        let body = Json(ErrorResponse {
            status: status.to_string(),
            message: error_message.to_string(),
            code: error_code.to_string(),
            // Internal details stay in the logs
            details: if status.is_server_error() {
                None
            } else {
                Some(self.to_string())
            },
            help: help_text.map(String::from),
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Wraps foreign errors into the matching `AppError` variant.
pub trait AppErrorExt<T> {
    fn config_err(self) -> AppResult<T>;
}

impl<T, E> AppErrorExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn config_err(self) -> AppResult<T> {
        self.map_err(|e| AppError::ConfigError(e.into()))
    }
}
