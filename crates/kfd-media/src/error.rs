//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("No frames were extracted from the video")]
    NoFramesExtracted,

    #[error("Input is empty")]
    EmptyInput,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Human-readable diagnostic, including the decoder's stderr when present.
    pub fn diagnostic(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => {
                format!("FFmpeg failed with error: {}", stderr.trim())
            }
            MediaError::FfmpegFailed {
                message,
                exit_code: Some(code),
                ..
            } => format!("{} (exit code {})", message, code),
            other => other.to_string(),
        }
    }
}
