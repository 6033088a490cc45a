//! Unified error handling with consistent API response envelope.
//!
//! Every lifecycle action answers with an [`ActionResult`] wrapped in the
//! [`ApiResponse`] envelope. Failures carry the same result-code vocabulary
//! ("400", "404", "409", "500") through [`AppError::result_code`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error detail in the API response envelope.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Consistent JSON envelope for all API responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a successful result in the envelope.
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            data: Some(data),
            error: None,
        })
    }

    /// Wrap an error in the envelope.
    pub fn error(code: &str, message: &str) -> Json<Self> {
        Json(Self {
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        })
    }
}

/// Outcome of a lifecycle action: result code, message, affected count and
/// an optional action-specific payload.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult<T: Serialize = serde_json::Value> {
    pub result_code: String,
    pub result_message: String,
    pub count: usize,
    pub result_object: Option<T>,
}

impl<T: Serialize> ActionResult<T> {
    pub fn ok(message: impl Into<String>, count: usize, result_object: Option<T>) -> Self {
        Self {
            result_code: "200".to_string(),
            result_message: message.into(),
            count,
            result_object,
        }
    }

    /// A completed action that touched nothing.
    pub fn nothing_processed(message: impl Into<String>) -> Self {
        Self {
            result_code: "500".to_string(),
            result_message: message.into(),
            count: 0,
            result_object: None,
        }
    }
}

/// Application error type mapping to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Result code reported alongside the message.
    pub fn result_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "404",
            Self::Validation(_) => "400",
            Self::Conflict(_) => "409",
            Self::Database(_) | Self::Internal(_) => "500",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, ApiResponse::<()>::error(code, &message)).into_response()
    }
}
