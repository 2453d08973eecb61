//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kfd_models::ErrorBody;
use kfd_pipeline::PipelineError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unsupported file type")]
    UnsupportedFileType,

    #[error("Uploaded file is too large")]
    PayloadTooLarge,

    #[error("{0}")]
    Processing(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Replace internal details with a generic message when `production`.
    pub fn redacted(self, production: bool) -> Self {
        match self {
            ApiError::Internal(_) if production => {
                ApiError::Internal("An internal error occurred".to_string())
            }
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::UnsupportedFileType => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Processing(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Validation(msg) => Self::BadRequest(msg),
            PipelineError::UnsupportedMediaType(_) => Self::UnsupportedFileType,
            PipelineError::ExtractionFailed(_) => Self::Processing(e.to_string()),
            PipelineError::Unexpected(_) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
