//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{health, infer, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, json_error_body, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Uploads replace axum's 2MB default with the configured limit
    let infer_routes = Router::new()
        .route("/infer", post(infer))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout,
        ))
        .layer(middleware::from_fn(json_error_body));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(infer_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use kfd_media::{FfmpegRunner, KeyframeExtractor};
    use kfd_ml_client::{Detector, MlError, MlResult};
    use kfd_models::{Detection, Thresholds};
    use kfd_pipeline::{PipelineConfig, PipelineController};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ApiConfig;

    const BOUNDARY: &str = "kfd-test-boundary";

    /// Reads comma-separated labels out of the image bytes; `fail` errors,
    /// `slow` stalls for seconds.
    struct LabelDetector {
        healthy: bool,
    }

    #[async_trait]
    impl Detector for LabelDetector {
        async fn detect(&self, image: &[u8], _thresholds: Thresholds) -> MlResult<Vec<Detection>> {
            let text = String::from_utf8_lossy(image);
            if text.trim() == "slow" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if text.trim() == "fail" {
                return Err(MlError::ServiceUnavailable("scripted failure".to_string()));
            }
            Ok(text
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| Detection {
                    label: l.to_string(),
                    confidence: 0.8,
                })
                .collect())
        }

        async fn health_check(&self) -> bool {
            self.healthy
        }
    }

    struct Harness {
        router: Router,
        work: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_pipeline(|p| p, true)
        }

        fn with_api_config(api: ApiConfig) -> Self {
            Self::build(api, |p| p, true)
        }

        fn with_pipeline(
            customize: impl FnOnce(PipelineController) -> PipelineController,
            healthy: bool,
        ) -> Self {
            Self::build(ApiConfig::default(), customize, healthy)
        }

        fn build(
            api: ApiConfig,
            customize: impl FnOnce(PipelineController) -> PipelineController,
            healthy: bool,
        ) -> Self {
            let work = TempDir::new().unwrap();
            let config = PipelineConfig {
                work_dir: work.path().to_path_buf(),
                ..Default::default()
            };
            let pipeline = customize(PipelineController::new(
                config,
                Arc::new(LabelDetector { healthy }),
            ));
            let state = AppState::new(api, pipeline);
            Self {
                router: create_router(state, None),
                work,
            }
        }

        #[cfg(unix)]
        fn with_fake_ffmpeg(script: &str) -> Self {
            let runner = FfmpegRunner::new()
                .with_program("sh", ["-c", script, "ffmpeg"])
                .with_timeout(10);
            Self::with_pipeline(|p| p.with_extractor(KeyframeExtractor::new(runner)), true)
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        fn work_dir_is_empty(&self) -> bool {
            std::fs::read_dir(self.work.path()).unwrap().next().is_none()
        }
    }

    enum Part<'a> {
        File(&'a str, &'a [u8]),
        Text(&'a str, &'a str),
    }

    fn upload(parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/infer")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::File(filename, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_image_upload_returns_counts() {
        let harness = Harness::new();
        let response = harness
            .send(upload(&[Part::File("leaf.jpg", b"leaf,leaf,leaf,stem,stem")]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            json_body(response).await,
            json!({"frame_count": 1, "total_objects": 5, "predictions": {"leaf": 3, "stem": 2}})
        );
        assert!(harness.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_thresholds_are_accepted() {
        let harness = Harness::new();
        let response = harness
            .send(upload(&[
                Part::Text("confidence", "55"),
                Part::Text("overlap", "12.5"),
                Part::File("frame.PNG", b"fruit"),
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["predictions"], json!({"fruit": 1}));
    }

    #[tokio::test]
    async fn test_missing_file_part() {
        let harness = Harness::new();
        let response = harness.send(upload(&[Part::Text("confidence", "40")])).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"error": "No file part"}));
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_missing_file() {
        let harness = Harness::new();
        let request = Request::builder()
            .method("POST")
            .uri("/infer")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = harness.send(request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"error": "No file part"}));
    }

    #[tokio::test]
    async fn test_non_numeric_threshold() {
        let harness = Harness::new();
        let response = harness
            .send(upload(&[
                Part::File("leaf.jpg", b"leaf"),
                Part::Text("confidence", "high"),
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Invalid parameter values. Parameters must be numbers"})
        );
    }

    #[tokio::test]
    async fn test_out_of_range_threshold() {
        let harness = Harness::new();
        let response = harness
            .send(upload(&[
                Part::File("leaf.jpg", b"leaf"),
                Part::Text("overlap", "150"),
            ]))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("overlap"));
    }

    #[tokio::test]
    async fn test_unsupported_file_type() {
        let harness = Harness::new();
        let response = harness.send(upload(&[Part::File("notes.txt", b"hello")])).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"error": "Unsupported file type"}));
        assert!(harness.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_image_detection_failure_yields_empty_counts() {
        let harness = Harness::new();
        let response = harness.send(upload(&[Part::File("leaf.jpeg", b"fail")])).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"frame_count": 1, "total_objects": 0, "predictions": {}})
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_video_upload_counts_keyframes() {
        let harness = Harness::with_fake_ffmpeg(
            r#"for a; do out=$a; done
            for i in 1 2 3; do printf fruit > "$(printf "$out" $i)"; done
            : > "$(printf "$out" 4)""#,
        );
        let response = harness
            .send(upload(&[Part::File("flight.h264", &[0, 0, 0, 1, 0x67])]))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"frame_count": 4, "total_objects": 3, "predictions": {"fruit": 3}})
        );
        assert!(harness.work_dir_is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_decoder_failure_is_server_error_with_stderr() {
        let harness = Harness::with_fake_ffmpeg(
            "echo 'input.h264: Invalid data found when processing input' >&2; exit 1",
        );
        let response = harness
            .send(upload(&[Part::File("flight.h264", &[1, 2, 3])]))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Error processing video"));
        assert!(message.contains("Invalid data found when processing input"));
        assert!(harness.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_json_413() {
        let harness = Harness::with_api_config(ApiConfig {
            max_body_size: 10,
            ..Default::default()
        });
        let body = multipart_body(&[Part::File("leaf.jpg", &[b'x'; 100])]);
        let request = Request::builder()
            .method("POST")
            .uri("/infer")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let response = harness.send(request).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Uploaded file is too large"})
        );
        assert!(harness.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_slow_request_is_json_408_and_cleaned_up() {
        let harness = Harness::with_api_config(ApiConfig {
            request_timeout: Duration::from_millis(100),
            ..Default::default()
        });

        let response = harness.send(upload(&[Part::File("leaf.jpg", b"slow")])).await;

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(json_body(response).await, json!({"error": "Request timed out"}));
        assert!(harness.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let harness = Harness::new();
        let request = Request::get("/health")
            .header("X-Request-ID", "greenhouse-7")
            .body(Body::empty())
            .unwrap();

        let response = harness.send(request).await;

        assert_eq!(response.headers()["x-request-id"], "greenhouse-7");
    }

    #[tokio::test]
    async fn test_health() {
        let harness = Harness::new();
        let response = harness
            .send(Request::get("/health").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ready_when_dependencies_available() {
        let harness = Harness::with_fake_ffmpeg("exit 0");
        let response = harness
            .send(Request::get("/ready").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["ffmpeg"]["status"], "ok");
        assert_eq!(body["checks"]["detector"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_degraded() {
        let runner = FfmpegRunner::new().with_program("kfd-no-such-ffmpeg", Vec::<String>::new());
        let harness =
            Harness::with_pipeline(|p| p.with_extractor(KeyframeExtractor::new(runner)), false);
        let response = harness
            .send(Request::get("/ready").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["ffmpeg"]["status"], "error");
        assert_eq!(body["checks"]["detector"]["status"], "error");
    }

    #[tokio::test]
    async fn test_metrics_route_absent_when_disabled() {
        let harness = Harness::new();
        let response = harness
            .send(Request::get("/metrics").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
