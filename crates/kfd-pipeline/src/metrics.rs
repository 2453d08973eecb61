//! Pipeline metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const PIPELINE_RUNS_TOTAL: &str = "kfd_pipeline_runs_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "kfd_pipeline_duration_seconds";
    pub const FRAMES_PROCESSED_TOTAL: &str = "kfd_frames_processed_total";
    pub const FRAME_FAILURES_TOTAL: &str = "kfd_frame_failures_total";
    pub const OBJECTS_DETECTED_TOTAL: &str = "kfd_objects_detected_total";
}

/// Record one finished pipeline invocation.
pub fn record_run(kind: &str, outcome: &str, duration_secs: f64) {
    let labels = [("kind", kind.to_string()), ("outcome", outcome.to_string())];
    counter!(names::PIPELINE_RUNS_TOTAL, &labels).increment(1);
    histogram!(names::PIPELINE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record aggregate frame results.
pub fn record_frames(processed: usize, failed: usize, objects: u64) {
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(processed as u64);
    counter!(names::FRAME_FAILURES_TOTAL).increment(failed as u64);
    counter!(names::OBJECTS_DETECTED_TOTAL).increment(objects);
}
