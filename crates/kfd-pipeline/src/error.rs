//! Pipeline error types.

use kfd_media::MediaError;
use kfd_models::ThresholdError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures surfaced to the caller of the pipeline.
///
/// Per-frame inference failures never appear here; they are absorbed by
/// the aggregator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),

    #[error("Error processing video: {0}")]
    ExtractionFailed(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Whether the caller sent something unusable (4xx) rather than the
    /// server failing to process it (5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_) | PipelineError::UnsupportedMediaType(_)
        )
    }
}

impl From<ThresholdError> for PipelineError {
    fn from(e: ThresholdError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<MediaError> for PipelineError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::EmptyInput => Self::Validation("Uploaded file is empty".to_string()),
            MediaError::FfmpegNotFound
            | MediaError::FfmpegFailed { .. }
            | MediaError::NoFramesExtracted
            | MediaError::Timeout(_) => Self::ExtractionFailed(e.diagnostic()),
            MediaError::Io(_) | MediaError::Internal(_) => {
                Self::Unexpected(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_mapping() {
        let err = PipelineError::from(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("moov atom not found".to_string()),
            Some(1),
        ));
        assert!(matches!(err, PipelineError::ExtractionFailed(_)));
        assert_eq!(
            err.to_string(),
            "Error processing video: FFmpeg failed with error: moov atom not found"
        );
        assert!(!err.is_client_error());

        let err = PipelineError::from(MediaError::NoFramesExtracted);
        assert_eq!(
            err.to_string(),
            "Error processing video: No frames were extracted from the video"
        );

        let err = PipelineError::from(MediaError::Io(std::io::Error::other("disk full")));
        assert!(matches!(err, PipelineError::Unexpected(_)));
    }

    #[test]
    fn test_client_errors() {
        assert!(PipelineError::validation("Uploaded file is empty").is_client_error());
        assert!(PipelineError::UnsupportedMediaType("a.txt".into()).is_client_error());
        assert!(PipelineError::from(ThresholdError::OutOfRange {
            name: "overlap",
            value: 250.0
        })
        .is_client_error());
    }
}
