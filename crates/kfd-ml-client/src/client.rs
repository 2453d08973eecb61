//! Detection service HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use kfd_models::{Detection, Thresholds};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use crate::detector::Detector;
use crate::error::{MlError, MlResult};
use crate::types::DetectionResponse;

/// Upper bound on a single backoff sleep.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Configuration for the detection client.
#[derive(Debug, Clone)]
pub struct DetectionClientConfig {
    /// Base URL of the hosted inference API
    pub base_url: String,
    /// API key sent with each request
    pub api_key: String,
    /// Model (project) identifier
    pub model_id: String,
    /// Model version
    pub model_version: u32,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// First retry delay; doubles per attempt
    pub retry_base_delay: Duration,
}

impl Default for DetectionClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://detect.roboflow.com".to_string(),
            api_key: String::new(),
            model_id: "esp32-czges".to_string(),
            model_version: 1,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl DetectionClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("DETECTION_API_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("DETECTION_API_KEY").unwrap_or(defaults.api_key),
            model_id: std::env::var("DETECTION_MODEL_ID").unwrap_or(defaults.model_id),
            model_version: std::env::var("DETECTION_MODEL_VERSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.model_version),
            timeout: Duration::from_secs(
                std::env::var("DETECTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("DETECTION_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: defaults.retry_base_delay,
        }
    }

    /// Endpoint for the configured model version.
    pub fn model_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.model_id,
            self.model_version
        )
    }
}

/// Client for the hosted detection model.
pub struct DetectionClient {
    http: Client,
    config: DetectionClientConfig,
}

impl DetectionClient {
    /// Create a new detection client.
    pub fn new(config: DetectionClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(DetectionClientConfig::from_env())
    }

    pub fn config(&self) -> &DetectionClientConfig {
        &self.config
    }

    /// Post one base64-encoded image and parse the predictions.
    async fn predict(&self, image: &[u8], thresholds: Thresholds) -> MlResult<DetectionResponse> {
        let url = self.config.model_url();
        let body = BASE64_STANDARD.encode(image);
        let query = [
            ("api_key", self.config.api_key.clone()),
            ("confidence", thresholds.confidence.to_string()),
            ("overlap", thresholds.overlap.to_string()),
        ];

        debug!(
            url = %url,
            confidence = thresholds.confidence,
            overlap = thresholds.overlap,
            bytes = image.len(),
            "Sending detection request"
        );

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .query(&query)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(body.clone())
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_timeout() {
                            MlError::Timeout(self.config.timeout.as_secs())
                        } else {
                            MlError::Network(e)
                        }
                    })?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let text = response.text().await.unwrap_or_default();
                    return Err(MlError::from_http_status(status, &text));
                }

                Ok(response)
            })
            .await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| MlError::InvalidResponse(e.to_string()))
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        "Detection request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(MlError::RequestFailed("Unknown error".to_string())))
    }
}

/// Exponential backoff for `attempt` (0-based), capped at [`MAX_RETRY_DELAY`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_RETRY_DELAY)
}

#[async_trait]
impl Detector for DetectionClient {
    async fn detect(&self, image: &[u8], thresholds: Thresholds) -> MlResult<Vec<Detection>> {
        let response = self.predict(image, thresholds).await?;

        let detections = response
            .predictions
            .into_iter()
            .filter_map(|p| {
                let label = p.class.filter(|c| !c.is_empty())?;
                debug!("Detected {} with confidence {}", label, p.confidence);
                Some(Detection {
                    label,
                    confidence: p.confidence,
                })
            })
            .collect();

        Ok(detections)
    }

    async fn health_check(&self) -> bool {
        match self.http.get(&self.config.base_url).send().await {
            Ok(response) if !response.status().is_server_error() => true,
            Ok(response) => {
                warn!("Detection service health check failed: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Detection service health check error: {}", e);
                false
            }
        }
    }
}
