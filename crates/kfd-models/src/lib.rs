//! Shared data models for the keyframe detection service.
//!
//! This crate provides Serde-serializable types for:
//! - Upload classification (video vs. still image)
//! - Detection thresholds and per-class count tables
//! - Extracted frame sets
//! - The `/infer` response schema

pub mod detection;
pub mod frame;
pub mod media;
pub mod response;

// Re-export common types
pub use detection::{ClassCounts, Detection, ThresholdError, Thresholds};
pub use frame::{FrameRef, FrameSet};
pub use media::MediaKind;
pub use response::{ErrorBody, InferResponse};
