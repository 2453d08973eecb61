//! Keyframe extraction from raw video streams.
//!
//! Only intra-coded frames are extracted: they decode on their own, so a
//! single `select` filter pass yields clean stills without reconstructing
//! the predicted frames in between.

use std::path::Path;
use std::time::Instant;

use kfd_models::FrameSet;
use metrics::histogram;
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::workspace::ScopedWorkspace;

/// Filter selecting I-frames only.
pub const KEYFRAME_FILTER: &str = "select='eq(pict_type,I)'";
/// Output file name prefix for extracted frames.
pub const FRAME_PREFIX: &str = "frame_";
/// Output image extension for extracted frames.
pub const FRAME_EXTENSION: &str = "jpg";
/// Demuxer for uploads, which are raw Annex B streams without a container.
pub const INPUT_FORMAT: &str = "h264";

const FRAMES_EXTRACTED: &str = "kfd_frames_extracted";
const EXTRACTION_DURATION_SECONDS: &str = "kfd_extraction_duration_seconds";

/// Extracts keyframes from a video buffer into a workspace.
#[derive(Debug, Clone)]
pub struct KeyframeExtractor {
    runner: FfmpegRunner,
}

impl Default for KeyframeExtractor {
    fn default() -> Self {
        Self::new(FfmpegRunner::new())
    }
}

impl KeyframeExtractor {
    /// Create an extractor for raw H.264 input.
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &FfmpegRunner {
        &self.runner
    }

    /// Build the extraction command for `input`, writing into `out_dir`.
    pub fn build_command(&self, input: &Path, out_dir: &Path) -> FfmpegCommand {
        let pattern = out_dir.join(format!("{}%04d.{}", FRAME_PREFIX, FRAME_EXTENSION));

        FfmpegCommand::new(input, pattern)
            .input_format(INPUT_FORMAT)
            .video_filter(KEYFRAME_FILTER)
            .vsync("0")
    }

    /// Persist `video` into `workspace`, decode its keyframes, and return
    /// them in extraction order.
    ///
    /// Fails with [`MediaError::NoFramesExtracted`] when FFmpeg succeeds but
    /// leaves no frame files behind.
    pub async fn extract(&self, workspace: &ScopedWorkspace, video: &[u8]) -> MediaResult<FrameSet> {
        if video.is_empty() {
            return Err(MediaError::EmptyInput);
        }

        let started = Instant::now();
        let input = workspace.write_file(format!("input.{}", INPUT_FORMAT), video).await?;
        let cmd = self.build_command(&input, workspace.path());

        let output = self.runner.run(&cmd).await.map_err(|e| {
            if let MediaError::FfmpegFailed { stderr, .. } = &e {
                warn!(
                    stderr = stderr.as_deref().unwrap_or_default().trim(),
                    "FFmpeg error"
                );
            }
            e
        })?;
        if !output.stderr.trim().is_empty() {
            debug!(stderr = output.stderr.trim(), "FFmpeg diagnostics");
        }

        let frames = list_frames(workspace.path()).await?;
        histogram!(EXTRACTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        if frames.is_empty() {
            return Err(MediaError::NoFramesExtracted);
        }

        histogram!(FRAMES_EXTRACTED).record(frames.len() as f64);
        info!(
            frames = frames.len(),
            bytes = video.len(),
            "Keyframe extraction completed"
        );
        Ok(frames)
    }
}

/// List frame files (`frame_*.jpg`) in `dir`, sorted by name.
pub async fn list_frames(dir: &Path) -> MediaResult<FrameSet> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_frame_file(&path) {
            paths.push(path);
        }
    }

    Ok(FrameSet::from_paths(paths))
}

fn is_frame_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(FRAME_PREFIX)
        && path.extension().and_then(|e| e.to_str()) == Some(FRAME_EXTENSION)
}
