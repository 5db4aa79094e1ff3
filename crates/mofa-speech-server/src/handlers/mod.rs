//! Request handlers for the speech API

pub mod audio;
pub mod health;

pub use audio::audio_router;
pub use health::health_router;
