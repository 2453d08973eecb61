//! Bounded parallel inference over a frame set.

use std::sync::Arc;

use kfd_ml_client::{Detector, MlError};
use kfd_models::{ClassCounts, FrameRef, FrameSet, Thresholds};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::metrics;

/// Why a single frame contributed nothing.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to read frame: {0}")]
    Read(#[from] std::io::Error),

    #[error("inference failed: {0}")]
    Inference(#[from] MlError),

    #[error("worker pool closed")]
    PoolClosed,
}

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    /// Merged class counts over all frames that succeeded
    pub counts: ClassCounts,
    /// Frames submitted for inference
    pub frames_submitted: usize,
    /// Frames that failed and contributed zero labels
    pub frames_failed: usize,
}

/// Runs one inference task per frame with at most `max_parallel` in flight
/// and folds the labels into a single count table.
///
/// A fresh pool is built per [`run`](Self::run) call. The table is owned by
/// the drain loop, so results are folded strictly one at a time.
pub struct ParallelAggregator {
    detector: Arc<dyn Detector>,
    max_parallel: usize,
}

impl ParallelAggregator {
    pub fn new(detector: Arc<dyn Detector>, max_parallel: usize) -> Self {
        Self {
            detector,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Run inference on every frame and merge the results.
    ///
    /// Never fails as a whole: a frame whose read, inference call, or task
    /// fails is logged and counted in `frames_failed`.
    pub async fn run(&self, frames: &FrameSet, thresholds: Thresholds) -> AggregateReport {
        let mut report = AggregateReport {
            frames_submitted: frames.len(),
            ..Default::default()
        };
        if frames.is_empty() {
            return report;
        }

        info!(
            frames = frames.len(),
            workers = self.max_parallel,
            "Processing frames using concurrent execution"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for frame in frames {
            let detector = Arc::clone(&self.detector);
            let semaphore = Arc::clone(&semaphore);
            let frame = frame.clone();

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => infer_frame(detector.as_ref(), &frame, thresholds).await,
                    Err(_) => Err(FrameError::PoolClosed),
                };
                (frame.id, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((frame_id, Ok(labels))) => {
                    debug!(frame = %frame_id, objects = labels.len(), "Frame processed");
                    report.counts.record_all(&labels);
                }
                Ok((frame_id, Err(e))) => {
                    error!(frame = %frame_id, error = %e, "Error processing frame");
                    report.frames_failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "Frame task did not complete");
                    report.frames_failed += 1;
                }
            }
        }

        metrics::record_frames(report.frames_submitted, report.frames_failed, report.counts.total());
        report
    }
}

async fn infer_frame(
    detector: &dyn Detector,
    frame: &FrameRef,
    thresholds: Thresholds,
) -> Result<Vec<String>, FrameError> {
    let image = tokio::fs::read(&frame.path).await?;
    Ok(detector.labels(&image, thresholds).await?)
}
