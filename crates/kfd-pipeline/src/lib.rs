//! Keyframe detection pipeline.
//!
//! Takes one uploaded file, extracts keyframes for H.264 input, runs the
//! detector over every frame with bounded parallelism and folds the labels
//! into per-class counts.

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;

#[cfg(test)]
mod test_support;

pub use aggregator::{AggregateReport, FrameError, ParallelAggregator};
pub use config::PipelineConfig;
pub use controller::{InferRequest, PipelineController};
pub use error::{PipelineError, PipelineResult};
