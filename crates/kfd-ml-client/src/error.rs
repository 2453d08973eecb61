//! ML client error types.

use thiserror::Error;

pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("Inference service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MlError {
    /// Map a non-success HTTP status from the service.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = format!("inference service returned {}: {}", status, body);
        match status {
            429 | 500..=599 => MlError::ServiceUnavailable(message),
            _ => MlError::RequestFailed(message),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MlError::ServiceUnavailable(_) | MlError::Timeout(_) | MlError::Network(_)
        )
    }
}
