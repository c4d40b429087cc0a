//! API Error Types
//!
//! Reads never fail at this layer (they degrade inside the service), so
//! these mostly come from request validation and deletes.

use crate::backend::{BackendError, FailureClass};
use crate::service::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Service(ServiceError::Unresolved { .. }) => {
                (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND")
            }
            ApiError::Service(ServiceError::Backend(e)) => backend_status(e),
            ApiError::Service(ServiceError::Cache(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

fn backend_status(error: &BackendError) -> (StatusCode, &'static str) {
    match error {
        BackendError::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_NOT_CONFIGURED"),
        BackendError::MissingRelation { .. } => (StatusCode::NOT_FOUND, "TABLE_NOT_FOUND"),
        BackendError::Denied { .. } => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        e if e.class() == FailureClass::Unreachable => {
            (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE")
        }
        _ => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
