//! Inference service response types.

use serde::{Deserialize, Serialize};

/// Response body of a detection call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    /// Source image size, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSize>,
}

/// One detected object instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prediction {
    /// Class label; entries without one are ignored
    #[serde(default)]
    pub class: Option<String>,
    /// Score in [0, 1]
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

/// Image dimensions echoed back by the service.
///
/// Some model versions report these as strings, others as numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: serde_json::Value,
    pub height: serde_json::Value,
}
