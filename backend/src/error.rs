use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::image::ImageError;
use crate::validation::{ValidationReport, Violation};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request data")]
    InvalidRequest(ValidationReport),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Image could not be decoded: {0}")]
    ImageDecode(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [Violation]>,
}

impl AppError {
    pub fn invalid(field: &str, code: &str, message: impl Into<String>) -> Self {
        AppError::InvalidRequest(ValidationReport::single(field, code, message))
    }
}

impl From<ValidationReport> for AppError {
    fn from(report: ValidationReport) -> Self {
        AppError::InvalidRequest(report)
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::TooLarge { .. } | ImageError::UnsupportedFormat => {
                AppError::invalid("file", "file", err.to_string())
            }
            ImageError::Decode(e) => AppError::ImageDecode(e.to_string()),
            ImageError::Encode(e) => AppError::Internal(anyhow::anyhow!("image encode failed: {}", e)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            AppError::InvalidRequest(report) => {
                tracing::debug!("Rejected request: {}", report);
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", self.to_string())
            }
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                self.to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::ImageDecode(msg) => {
                tracing::debug!("Image decode failed: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    "IMAGE_DECODE_ERROR",
                    "The uploaded file is not a readable image".to_string(),
                )
            }
            AppError::Jwt(e) => {
                tracing::warn!("JWT error: {:?}", e);
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized".to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPLOAD_ERROR",
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let details = match &self {
            AppError::InvalidRequest(report) => Some(report.violations()),
            _ => None,
        };

        let body = ErrorResponse {
            error: message,
            code,
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Fallback for routes reached with a method they do not serve.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
