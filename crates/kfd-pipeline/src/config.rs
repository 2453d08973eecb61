//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use kfd_models::Thresholds;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Thresholds used when a request omits them
    pub default_thresholds: Thresholds,
    /// Maximum concurrent inference calls per video
    pub max_parallel: usize,
    /// Parent directory for per-request temp files
    pub work_dir: PathBuf,
    /// Upper bound on a single FFmpeg run
    pub ffmpeg_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_thresholds: Thresholds::default(),
            max_parallel: 4,
            work_dir: std::env::temp_dir(),
            ffmpeg_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Thresholds::default();
        Self {
            default_thresholds: Thresholds {
                confidence: std::env::var("INFER_DEFAULT_CONFIDENCE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.confidence),
                overlap: std::env::var("INFER_DEFAULT_OVERLAP")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.overlap),
            },
            max_parallel: std::env::var("INFER_MAX_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(4),
            work_dir: std::env::var("INFER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}
