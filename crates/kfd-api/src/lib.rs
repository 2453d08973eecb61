//! Axum HTTP server for keyframe object detection.
//!
//! This crate provides:
//! - `POST /infer` multipart upload of one image or raw H.264 stream
//! - Liveness/readiness checks
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
