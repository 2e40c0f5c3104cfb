use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Details surfaced to a client whose request was rate limited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRejection {
    pub limit: u64,
    pub retry_after_secs: u64,
    /// Unix timestamp when the current window frees up a slot
    pub reset: i64,
    pub window: String,
}

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    DatabaseMigration(#[from] sqlx::migrate::MigrateError),

    // Authentication errors
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
    #[error("Token validation failed: {0}")]
    TokenValidation(String),
    #[error("Token has expired")]
    TokenExpired,
    #[error("{0}")]
    Unauthorized(String),

    // Authorization errors
    #[error("{0}")]
    Forbidden(String),

    // Resource errors
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    PostNotFound(String),
    #[error("Email already exists")]
    EmailAlreadyExists,

    // Rate limiting
    #[error("Rate limit exceeded")]
    RateLimitExceeded(RateLimitRejection),

    // Validation errors
    #[error("Invalid input: {0}")]
    ValidationError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Cryptographic errors
    #[error("Cryptographic error: {0}")]
    Cryptographic(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            ErrorKind::InvalidToken => AppError::TokenValidation("Invalid token".to_string()),
            _ => AppError::TokenValidation(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

// Implement IntoResponse for Axum
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::RateLimitExceeded(rejection) = self {
            return rate_limited_response(rejection);
        }

        let (status, message) = match &self {
            AppError::Database(_) | AppError::DatabaseMigration(_) => {
                tracing::error!("Database error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::TokenGeneration(_) => {
                tracing::error!("Token generation error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate token".to_string())
            }
            AppError::TokenValidation(_) | AppError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
            }
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::UserNotFound | AppError::PostNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, self.to_string()),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Configuration(_) | AppError::Cryptographic(_) | AppError::Internal(_) => {
                tracing::error!("Internal error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::RateLimitExceeded(_) => unreachable!("handled above"),
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

fn rate_limited_response(rejection: RateLimitRejection) -> Response {
    let body = Json(json!({
        "status": "error",
        "message": "Rate limit exceeded. Please try again later.",
        "retry_after": rejection.retry_after_secs,
        "limit": rejection.limit,
        "window": rejection.window,
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(rejection.retry_after_secs));
    headers.insert("x-ratelimit-limit", HeaderValue::from(rejection.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
    headers.insert("x-ratelimit-reset", HeaderValue::from(rejection.reset));

    response
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;
