//! Client for the hosted object-detection inference service.
//!
//! The service takes one base64-encoded image plus confidence/overlap
//! percentages and answers with a list of predictions. Only the class label
//! of each prediction is consumed downstream.

pub mod client;
pub mod detector;
pub mod error;
pub mod types;

pub use client::{DetectionClient, DetectionClientConfig};
pub use detector::Detector;
pub use error::{MlError, MlResult};
pub use types::{DetectionResponse, Prediction};
