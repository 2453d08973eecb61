//! Application state.

use std::sync::Arc;

use kfd_pipeline::PipelineController;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<PipelineController>,
}

impl AppState {
    /// Create new application state around an already-built pipeline.
    pub fn new(config: ApiConfig, pipeline: PipelineController) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }
}
