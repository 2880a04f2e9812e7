use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request payload failed validation. Carries the first offending field.
    #[error("{message}")]
    Validation {
        /// Name of the first field that failed.
        field: &'static str,
        /// Human-readable reason.
        message: String,
    },

    /// Missing or malformed Authorization header.
    #[error("{0}")]
    Unauthorized(String),

    /// Token present but invalid or expired.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found error.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate value for a unique field.
    #[error("{0}")]
    Conflict(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Object storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status mirrored into the response envelope.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Unanticipated failures are logged with their cause; the wire gets
        // a generic message.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
            "Something went wrong, please try again later.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(serde_json::json!({
            "statusCode": status.as_u16(),
            "data": null,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
