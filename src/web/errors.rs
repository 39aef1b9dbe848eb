//! # Web API Error Types
//!
//! Error types specific to the web API and their HTTP response conversions.
//! Only pre-stream errors can become structured responses; once body bytes
//! are on the wire, failures terminate the stream instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::ExportError;

/// Web API specific errors with HTTP status code mappings.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found")]
    NotFound,

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Database operation failed: {operation}")]
    DatabaseError { operation: String },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn database_error(operation: impl Into<String>) -> Self {
        Self::DatabaseError {
            operation: operation.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found"),

            ApiError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.as_str())
            }

            ApiError::DatabaseError { operation } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                operation.as_str(),
            ),

            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": message
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

/// Pre-stream pipeline errors map onto structured responses; everything
/// that can only happen mid-stream maps to Internal as a fallback for
/// callers that fail before streaming starts.
impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnsupportedType(token) => {
                ApiError::bad_request(format!("unsupported object type: {token}"))
            }
            ExportError::UnsupportedFeature { .. } => ApiError::NotFound,
            ExportError::FilterSyntax(message) => ApiError::bad_request(message),
            ExportError::Store(e) => ApiError::database_error(e.to_string()),
            _ => ApiError::Internal,
        }
    }
}

/// Result type alias for web API operations.
pub type ApiResult<T> = Result<T, ApiError>;
