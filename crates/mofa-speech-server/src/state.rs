//! Shared application state for the speech server

use std::sync::Arc;

use mofa_speech::config::ModelsConfig;
use mofa_speech::coordinator::ModelCoordinator;

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Sole owner of the accelerator slot
    pub coordinator: Arc<ModelCoordinator>,
    /// Model ids accepted by the audio endpoints
    pub models: Arc<ModelsConfig>,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(
        coordinator: Arc<ModelCoordinator>,
        models: ModelsConfig,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            coordinator,
            models: Arc::new(models),
            max_upload_bytes,
        }
    }
}
