//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docqa_rag::QueryError;
use thiserror::Error;

use crate::models::{ErrorResponse, FieldError, ValidationErrorResponse};

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("ingestion failed: {0}")]
    IngestionFailed(String),

    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// The status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RetrievalFailed(_) | Self::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            Self::IngestionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Validation { field, message } => Self::validation(field, message),
            QueryError::RetrievalFailed(msg) => Self::RetrievalFailed(msg),
            QueryError::GenerationFailed(msg) => Self::GenerationFailed(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message, detail) = match self {
            ApiError::Validation { field, message } => {
                let body = ValidationErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "Request validation failed".to_string(),
                    errors: vec![FieldError { field, message }],
                };
                return (status, Json(body)).into_response();
            }
            ApiError::RetrievalFailed(detail) => {
                ("RetrievalFailed", "Could not search the document index", detail)
            }
            ApiError::GenerationFailed(detail) => {
                ("GenerationFailed", "Could not generate an answer", detail)
            }
            ApiError::IngestionFailed(detail) => {
                ("IngestionFailed", "Could not process the uploaded document", detail)
            }
            ApiError::IndexUnavailable(detail) => {
                ("IndexUnavailable", "The document index is unavailable", detail)
            }
            ApiError::PayloadTooLarge(detail) => {
                ("PayloadTooLarge", "The uploaded document is too large", detail)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
            detail: Some(detail),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
