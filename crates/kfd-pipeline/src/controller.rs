//! Upload-to-counts orchestration.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use kfd_media::{FfmpegRunner, KeyframeExtractor, ScopedWorkspace, ScratchFile};
use kfd_ml_client::Detector;
use kfd_models::{FrameSet, InferResponse, MediaKind, Thresholds};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::aggregator::{AggregateReport, ParallelAggregator};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::metrics;

/// One uploaded file plus the thresholds to apply.
#[derive(Debug, Clone)]
pub struct InferRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub thresholds: Thresholds,
}

impl InferRequest {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>, thresholds: Thresholds) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            thresholds,
        }
    }
}

/// Single entry point from an upload to a [`InferResponse`].
///
/// Built once at startup with the shared detector handle. Every temp file or
/// directory an invocation creates is gone once `infer` returns or its
/// future is dropped.
pub struct PipelineController {
    config: PipelineConfig,
    detector: Arc<dyn Detector>,
    extractor: KeyframeExtractor,
}

impl PipelineController {
    pub fn new(config: PipelineConfig, detector: Arc<dyn Detector>) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout.as_secs());
        Self {
            extractor: KeyframeExtractor::new(runner),
            config,
            detector,
        }
    }

    /// Replace the keyframe extractor (e.g. to point at another FFmpeg build).
    pub fn with_extractor(mut self, extractor: KeyframeExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector(&self) -> &Arc<dyn Detector> {
        &self.detector
    }

    pub fn extractor(&self) -> &KeyframeExtractor {
        &self.extractor
    }

    fn aggregator(&self) -> ParallelAggregator {
        ParallelAggregator::new(Arc::clone(&self.detector), self.config.max_parallel)
    }

    /// Classify, process, and clean up one upload.
    pub async fn infer(&self, request: InferRequest) -> PipelineResult<InferResponse> {
        let kind = MediaKind::from_filename(&request.filename)
            .ok_or_else(|| PipelineError::UnsupportedMediaType(request.filename.clone()))?;
        if request.bytes.is_empty() {
            return Err(PipelineError::validation("Uploaded file is empty"));
        }
        request.thresholds.validate()?;

        let span = tracing::info_span!(
            "infer",
            invocation_id = %Uuid::new_v4(),
            filename = %request.filename,
            kind = %kind
        );

        async move {
            info!(
                confidence = request.thresholds.confidence,
                overlap = request.thresholds.overlap,
                bytes = request.bytes.len(),
                "Processing file"
            );

            let started = Instant::now();
            let result = match kind {
                MediaKind::Video => self.process_video(&request).await,
                MediaKind::Image => self.process_image(&request).await,
            };
            let elapsed = started.elapsed().as_secs_f64();

            match &result {
                Ok(response) => {
                    metrics::record_run(kind.as_str(), "success", elapsed);
                    info!(
                        "Successfully processed {}. Found {} objects in {} frames",
                        request.filename, response.total_objects, response.frame_count
                    );
                }
                Err(e) => {
                    metrics::record_run(kind.as_str(), "error", elapsed);
                    error!(error = %e, "Processing error");
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn process_video(&self, request: &InferRequest) -> PipelineResult<InferResponse> {
        let workspace = ScopedWorkspace::create_in(&self.config.work_dir)?;
        let result = self.aggregate_video(&workspace, request).await;
        workspace.close();
        result
    }

    async fn aggregate_video(
        &self,
        workspace: &ScopedWorkspace,
        request: &InferRequest,
    ) -> PipelineResult<InferResponse> {
        let frames = self.extractor.extract(workspace, &request.bytes).await?;
        let report = self.aggregator().run(&frames, request.thresholds).await;
        log_degraded(&report);

        info!(
            frames = frames.len(),
            classes = report.counts.len(),
            "Processed frames"
        );
        Ok(InferResponse::new(frames.len(), report.counts))
    }

    async fn process_image(&self, request: &InferRequest) -> PipelineResult<InferResponse> {
        let suffix = Path::new(&request.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();

        let scratch = ScratchFile::create_in(&self.config.work_dir, &suffix, &request.bytes).await?;
        let report = self
            .aggregator()
            .run(&FrameSet::single(scratch.path()), request.thresholds)
            .await;
        scratch.close();
        log_degraded(&report);

        Ok(InferResponse::new(1, report.counts))
    }
}

fn log_degraded(report: &AggregateReport) {
    if report.frames_failed > 0 {
        warn!(
            failed = report.frames_failed,
            submitted = report.frames_submitted,
            "Some frames contributed no detections"
        );
    }
}
