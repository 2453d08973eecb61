//! Detector abstraction.

use async_trait::async_trait;
use kfd_models::{Detection, Thresholds};

use crate::error::MlResult;

/// One-image object detection.
///
/// Implementations are stateless request/response boundaries; a single
/// handle is built at startup and shared across requests.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect objects in one encoded image.
    async fn detect(&self, image: &[u8], thresholds: Thresholds) -> MlResult<Vec<Detection>>;

    /// Detected class labels, one entry per object instance.
    async fn labels(&self, image: &[u8], thresholds: Thresholds) -> MlResult<Vec<String>> {
        let detections = self.detect(image, thresholds).await?;
        Ok(detections.into_iter().map(|d| d.label).collect())
    }

    /// Whether the backing service is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}
