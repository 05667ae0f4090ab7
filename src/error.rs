use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid service profile, admin user or settings file
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A DVR or catalog call returned an unusable response
    #[error("External API error: {0}")]
    ExternalApi(String),

    /// A newer run of the same scheduler took over
    #[error("New session was started, old session {0} aborted")]
    SessionSuperseded(uuid::Uuid),

    /// `cancel()` was observed at a tick boundary
    #[error("Run was aborted")]
    Aborted,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error only signals that a run stopped early on request
    pub fn is_interruption(&self) -> bool {
        matches!(self, AppError::SessionSuperseded(_) | AppError::Aborted)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Configuration(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::SessionSuperseded(_) | AppError::Aborted => {
                (StatusCode::CONFLICT, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
