//! `/infer` response schema.

use serde::{Deserialize, Serialize};

use crate::detection::ClassCounts;

/// Successful inference result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferResponse {
    /// Frames analysed (1 for images, keyframe count for video)
    pub frame_count: usize,
    /// Sum of all class counts
    pub total_objects: u64,
    /// Per-class instance counts
    pub predictions: ClassCounts,
}

impl InferResponse {
    /// Build the response from the final count table.
    ///
    /// `total_objects` is derived here, once, from the finished table.
    pub fn new(frame_count: usize, predictions: ClassCounts) -> Self {
        Self {
            frame_count,
            total_objects: predictions.total(),
            predictions,
        }
    }
}

/// Error body returned on every failure path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
