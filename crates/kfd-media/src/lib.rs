//! FFmpeg CLI wrapper for keyframe extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeout support
//! - Scoped temp workspaces that clean up on every exit path
//! - I-frame extraction from raw H.264 streams

pub mod command;
pub mod error;
pub mod keyframes;
pub mod workspace;

pub use command::{FfmpegCommand, FfmpegOutput, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use keyframes::{list_frames, KeyframeExtractor};
pub use workspace::{ScopedWorkspace, ScratchFile};
