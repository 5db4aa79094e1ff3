//! Model adapter boundary.
//!
//! An adapter wraps one model family's weights and inference library. The
//! coordinator is the only component allowed to drive `load()`/`unload()`;
//! request handlers reach inference exclusively through an
//! [`AdapterHandle`](crate::coordinator::AdapterHandle).
//!
//! Both lifecycle calls must be idempotent: loading an already-loaded
//! adapter and unloading an unloaded one are successful no-ops.

pub mod request;
pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AdapterResult;
use crate::types::ModelFamily;

pub use request::{
    AudioFormat, EmotionConfig, EmotionMode, SpeechRequest, SynthesizedAudio, TimestampGranularity,
    Transcription, TranscriptionRequest, TranscriptionSegment, TranscriptionWord,
};
pub use simulated::{SimulatedAccelerator, SimulatedSttAdapter, SimulatedTtsAdapter};

/// Lifecycle surface shared by every model adapter.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Which family this adapter serves
    fn family(&self) -> ModelFamily;

    /// Identifier reported to health/metrics readers
    fn model_name(&self) -> &str;

    /// Allocate accelerator memory and bring the model up. Idempotent.
    async fn load(&self) -> AdapterResult<()>;

    /// Release accelerator memory. Idempotent.
    async fn unload(&self) -> AdapterResult<()>;

    fn is_loaded(&self) -> bool;

    /// Estimated accelerator footprint once loaded, in bytes.
    fn memory_footprint_bytes(&self) -> u64 {
        0
    }
}

/// Speech-to-text inference entry point.
#[async_trait]
pub trait SpeechToText: ModelAdapter {
    async fn transcribe(&self, request: TranscriptionRequest) -> AdapterResult<Transcription>;
}

/// Text-to-speech inference entry point.
#[async_trait]
pub trait TextToSpeech: ModelAdapter {
    async fn synthesize(&self, request: SpeechRequest) -> AdapterResult<SynthesizedAudio>;
}

/// A family-tagged adapter reference. Cloning is cheap (`Arc`).
#[derive(Clone)]
pub enum Adapter {
    Stt(Arc<dyn SpeechToText>),
    Tts(Arc<dyn TextToSpeech>),
}

impl Adapter {
    pub fn family(&self) -> ModelFamily {
        match self {
            Adapter::Stt(_) => ModelFamily::Stt,
            Adapter::Tts(_) => ModelFamily::Tts,
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            Adapter::Stt(a) => a.model_name(),
            Adapter::Tts(a) => a.model_name(),
        }
    }

    pub async fn load(&self) -> AdapterResult<()> {
        match self {
            Adapter::Stt(a) => a.load().await,
            Adapter::Tts(a) => a.load().await,
        }
    }

    pub async fn unload(&self) -> AdapterResult<()> {
        match self {
            Adapter::Stt(a) => a.unload().await,
            Adapter::Tts(a) => a.unload().await,
        }
    }

    pub fn is_loaded(&self) -> bool {
        match self {
            Adapter::Stt(a) => a.is_loaded(),
            Adapter::Tts(a) => a.is_loaded(),
        }
    }

    pub fn memory_footprint_bytes(&self) -> u64 {
        match self {
            Adapter::Stt(a) => a.memory_footprint_bytes(),
            Adapter::Tts(a) => a.memory_footprint_bytes(),
        }
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("family", &self.family())
            .field("model", &self.model_name())
            .finish()
    }
}
