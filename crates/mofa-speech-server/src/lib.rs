//! `mofa-speech-server` - OpenAI-compatible speech API.
//!
//! Serves `/v1/audio/transcriptions` and `/v1/audio/speech` from a single
//! accelerator shared by a speech-to-text and a text-to-speech model. All
//! model residency decisions go through one
//! [`ModelCoordinator`](mofa_speech::coordinator::ModelCoordinator) held in
//! [`state::AppState`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mofa_speech::config::SpeechConfig;
//! use mofa_speech_server::{backend, server::SpeechServer};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = SpeechConfig::default();
//!     let coordinator = Arc::new(backend::build_coordinator(&config));
//!     SpeechServer::new(config, coordinator)
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod backend;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod validation;
