//! Upload-and-infer handler.

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use kfd_models::{InferResponse, Thresholds};
use kfd_pipeline::InferRequest;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const NO_FILE_PART: &str = "No file part";
const THRESHOLDS_NOT_NUMBERS: &str = "Invalid parameter values. Parameters must be numbers";

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// Fields of the `/infer` multipart form.
#[derive(Default)]
struct InferForm {
    file: Option<UploadedFile>,
    confidence: Option<String>,
    overlap: Option<String>,
}

impl InferForm {
    async fn read(multipart: &mut Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" if form.file.is_none() => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await.map_err(malformed)?;
                    form.file = Some(UploadedFile {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
                "confidence" => form.confidence = Some(field.text().await.map_err(malformed)?),
                "overlap" => form.overlap = Some(field.text().await.map_err(malformed)?),
                other => debug!(field = other, "Ignoring form field"),
            }
        }

        Ok(form)
    }

    /// Thresholds from the form, falling back to `defaults` for absent fields.
    fn thresholds(&self, defaults: Thresholds) -> ApiResult<Thresholds> {
        Ok(Thresholds::new(
            parse_threshold(self.confidence.as_deref(), defaults.confidence)?,
            parse_threshold(self.overlap.as_deref(), defaults.overlap)?,
        ))
    }
}

fn parse_threshold(raw: Option<&str>, default: f64) -> ApiResult<f64> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ApiError::bad_request(THRESHOLDS_NOT_NUMBERS)),
    }
}

fn malformed(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::bad_request(format!("Malformed multipart body: {}", e.body_text()))
    }
}

/// Accept one image or raw H.264 upload and return per-class object counts.
pub async fn infer(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<InferResponse>> {
    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "Upload is not a multipart form");
        ApiError::bad_request(NO_FILE_PART)
    })?;

    let mut form = InferForm::read(&mut multipart).await?;
    let file = form.file.take().ok_or_else(|| ApiError::bad_request(NO_FILE_PART))?;
    let thresholds = form.thresholds(state.pipeline.config().default_thresholds)?;

    let response = state
        .pipeline
        .infer(InferRequest::new(file.bytes, file.filename, thresholds))
        .await
        .map_err(|e| ApiError::from(e).redacted(state.config.is_production()))?;

    Ok(Json(response))
}
