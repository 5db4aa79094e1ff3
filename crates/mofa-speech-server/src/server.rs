//! Axum-based HTTP speech server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/v1/audio/transcriptions` | Speech-to-text (multipart upload). |
//! | `POST` | `/v1/audio/speech` | Text-to-speech with voice cloning. |
//! | `GET`  | `/health` | Device, memory and model slot status. |
//! | `GET`  | `/v1/models` | Configured model ids. |
//! | `GET`  | `/metrics` | Switch statistics and leak detection. |
//! | `GET`  | `/` | Service banner. |

use std::future::Future;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use mofa_speech::config::SpeechConfig;
use mofa_speech::coordinator::ModelCoordinator;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{audio_router, health_router};
use crate::state::AppState;

/// Room for the multipart framing and text fields around the uploaded file,
/// so an oversized file still reaches the explicit size check.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Build the axum [`Router`] over the given state.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .max_upload_bytes
        .saturating_add(FORM_OVERHEAD_BYTES)
        .min(usize::MAX as u64) as usize;

    Router::new()
        .merge(audio_router())
        .merge(health_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The speech service: configuration plus the coordinator it serves from.
pub struct SpeechServer {
    config: SpeechConfig,
    coordinator: Arc<ModelCoordinator>,
}

impl SpeechServer {
    pub fn new(config: SpeechConfig, coordinator: Arc<ModelCoordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<ModelCoordinator> {
        &self.coordinator
    }

    pub fn build_app(&self) -> Router {
        build_router(AppState::new(
            self.coordinator.clone(),
            self.config.models.clone(),
            self.config.server.max_upload_bytes,
        ))
    }

    /// Preload, bind, serve until `shutdown` resolves, then release the
    /// accelerator.
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.coordinator
            .initialize(self.config.coordinator.preload)
            .await;

        let app = self.build_app();
        let addr = self.config.server.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %addr, "MoFA speech server listening");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        self.coordinator.shutdown().await;
        info!("MoFA speech server stopped");
        served
    }
}
