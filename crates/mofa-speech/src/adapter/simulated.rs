//! Simulated accelerator and model adapters.
//!
//! Used as the server's backend when no real inference library is wired in,
//! and by tests that need believable memory behaviour. Adapters allocate
//! their footprint on a shared [`SimulatedAccelerator`] ledger after a
//! configurable load latency, so the memory monitor, leak detection and the
//! single-slot invariant can all be exercised end to end.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::request::{
    AudioFormat, SpeechRequest, SynthesizedAudio, TimestampGranularity, Transcription,
    TranscriptionRequest, TranscriptionSegment, TranscriptionWord,
};
use super::{ModelAdapter, SpeechToText, TextToSpeech};
use crate::error::{AdapterError, AdapterResult};
use crate::monitor::{DeviceInfo, MemoryProbe, MemorySnapshot};
use crate::types::ModelFamily;

const SYNTH_SAMPLE_RATE: u32 = 24_000;
const SECONDS_PER_CHAR: f32 = 0.06;

/// A fake accelerator: a fixed capacity and a ledger of named allocations.
pub struct SimulatedAccelerator {
    name: String,
    total_bytes: u64,
    allocations: Mutex<HashMap<String, u64>>,
}

impl SimulatedAccelerator {
    pub fn new(name: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            name: name.into(),
            total_bytes,
            allocations: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve `bytes` for `owner`. Fails when the device would overflow.
    pub fn allocate(&self, owner: &str, bytes: u64) -> AdapterResult<()> {
        let mut allocations = self.allocations.lock();
        let used: u64 = allocations
            .iter()
            .filter(|(k, _)| k.as_str() != owner)
            .map(|(_, v)| *v)
            .sum();
        let free = self.total_bytes.saturating_sub(used);
        if bytes > free {
            return Err(AdapterError::OutOfMemory {
                requested: bytes,
                free,
            });
        }
        allocations.insert(owner.to_string(), bytes);
        Ok(())
    }

    /// Release everything held by `owner`; returns the freed byte count.
    pub fn release(&self, owner: &str) -> u64 {
        self.allocations.lock().remove(owner).unwrap_or(0)
    }

    pub fn used_bytes(&self) -> u64 {
        self.allocations.lock().values().sum()
    }

    /// Owners currently holding memory, sorted.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.allocations.lock().keys().cloned().collect();
        owners.sort();
        owners
    }
}

impl MemoryProbe for SimulatedAccelerator {
    fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot::new(self.total_bytes, self.used_bytes())
    }

    fn device(&self) -> DeviceInfo {
        DeviceInfo {
            available: true,
            device_name: self.name.clone(),
            backend: "simulated".to_string(),
            driver_version: None,
            device_count: 1,
        }
    }
}

/// Lifecycle shared by both simulated adapters.
struct SimulatedModel {
    family: ModelFamily,
    name: String,
    footprint_bytes: u64,
    load_latency: Duration,
    accelerator: Arc<SimulatedAccelerator>,
    loaded: AtomicBool,
}

impl SimulatedModel {
    fn owner(&self) -> String {
        format!("{}:{}", self.family, self.name)
    }

    async fn load(&self) -> AdapterResult<()> {
        if self.loaded.load(Ordering::SeqCst) {
            debug!(model = %self.name, "simulated model already loaded");
            return Ok(());
        }
        tokio::time::sleep(self.load_latency).await;
        self.accelerator.allocate(&self.owner(), self.footprint_bytes)?;
        self.loaded.store(true, Ordering::SeqCst);
        info!(model = %self.name, family = %self.family, "simulated model loaded");
        Ok(())
    }

    async fn unload(&self) -> AdapterResult<()> {
        if !self.loaded.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let freed = self.accelerator.release(&self.owner());
        info!(model = %self.name, freed_bytes = freed, "simulated model unloaded");
        Ok(())
    }

    fn ensure_loaded(&self) -> AdapterResult<()> {
        if self.loaded.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AdapterError::NotLoaded)
        }
    }
}

/// Simulated speech-to-text model
pub struct SimulatedSttAdapter {
    model: SimulatedModel,
}

impl SimulatedSttAdapter {
    pub fn new(
        name: impl Into<String>,
        footprint_bytes: u64,
        load_latency: Duration,
        accelerator: Arc<SimulatedAccelerator>,
    ) -> Self {
        Self {
            model: SimulatedModel {
                family: ModelFamily::Stt,
                name: name.into(),
                footprint_bytes,
                load_latency,
                accelerator,
                loaded: AtomicBool::new(false),
            },
        }
    }
}

#[async_trait]
impl ModelAdapter for SimulatedSttAdapter {
    fn family(&self) -> ModelFamily {
        ModelFamily::Stt
    }

    fn model_name(&self) -> &str {
        &self.model.name
    }

    async fn load(&self) -> AdapterResult<()> {
        self.model.load().await
    }

    async fn unload(&self) -> AdapterResult<()> {
        self.model.unload().await
    }

    fn is_loaded(&self) -> bool {
        self.model.loaded.load(Ordering::SeqCst)
    }

    fn memory_footprint_bytes(&self) -> u64 {
        self.model.footprint_bytes
    }
}

#[async_trait]
impl SpeechToText for SimulatedSttAdapter {
    async fn transcribe(&self, request: TranscriptionRequest) -> AdapterResult<Transcription> {
        self.model.ensure_loaded()?;
        if request.audio.is_empty() {
            return Err(AdapterError::Inference("audio payload is empty".to_string()));
        }

        let duration = wav_duration_secs(&request.audio).unwrap_or(0.0);
        let text = format!(
            "simulated transcription of {} bytes of audio",
            request.audio.len()
        );

        let segments = if request
            .timestamp_granularities
            .contains(&TimestampGranularity::Segment)
        {
            vec![TranscriptionSegment {
                id: 0,
                seek: 0,
                start: 0.0,
                end: duration,
                text: text.clone(),
                tokens: Vec::new(),
                temperature: request.temperature,
                avg_logprob: 0.0,
                compression_ratio: 1.0,
                no_speech_prob: 0.0,
            }]
        } else {
            Vec::new()
        };

        let words = if request
            .timestamp_granularities
            .contains(&TimestampGranularity::Word)
        {
            spread_words(&text, duration)
        } else {
            Vec::new()
        };

        Ok(Transcription {
            text,
            language: Some(request.language.unwrap_or_else(|| "en".to_string())),
            duration_secs: duration,
            segments,
            words,
        })
    }
}

/// Simulated text-to-speech model. Renders silence of a plausible length.
pub struct SimulatedTtsAdapter {
    model: SimulatedModel,
}

impl SimulatedTtsAdapter {
    pub fn new(
        name: impl Into<String>,
        footprint_bytes: u64,
        load_latency: Duration,
        accelerator: Arc<SimulatedAccelerator>,
    ) -> Self {
        Self {
            model: SimulatedModel {
                family: ModelFamily::Tts,
                name: name.into(),
                footprint_bytes,
                load_latency,
                accelerator,
                loaded: AtomicBool::new(false),
            },
        }
    }
}

#[async_trait]
impl ModelAdapter for SimulatedTtsAdapter {
    fn family(&self) -> ModelFamily {
        ModelFamily::Tts
    }

    fn model_name(&self) -> &str {
        &self.model.name
    }

    async fn load(&self) -> AdapterResult<()> {
        self.model.load().await
    }

    async fn unload(&self) -> AdapterResult<()> {
        self.model.unload().await
    }

    fn is_loaded(&self) -> bool {
        self.model.loaded.load(Ordering::SeqCst)
    }

    fn memory_footprint_bytes(&self) -> u64 {
        self.model.footprint_bytes
    }
}

#[async_trait]
impl TextToSpeech for SimulatedTtsAdapter {
    async fn synthesize(&self, request: SpeechRequest) -> AdapterResult<SynthesizedAudio> {
        self.model.ensure_loaded()?;
        if request.format != AudioFormat::Wav {
            return Err(AdapterError::Unsupported(format!(
                "simulated backend renders wav only, got {}",
                request.format
            )));
        }

        let speed = if request.speed > 0.0 { request.speed } else { 1.0 };
        let seconds = (request.input.chars().count() as f32 * SECONDS_PER_CHAR / speed).max(0.5);
        let samples = (seconds * SYNTH_SAMPLE_RATE as f32) as u32;

        let bytes = render_silence(samples, SYNTH_SAMPLE_RATE)
            .map_err(|e| AdapterError::Inference(e.to_string()))?;

        Ok(SynthesizedAudio {
            bytes,
            format: AudioFormat::Wav,
            sample_rate: SYNTH_SAMPLE_RATE,
        })
    }
}

fn render_silence(samples: u32, sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec)?;
        for _ in 0..samples {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
    }
    Ok(buf.into_inner())
}

fn wav_duration_secs(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / spec.sample_rate as f64)
}

fn spread_words(text: &str, duration: f64) -> Vec<TranscriptionWord> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let step = duration / words.len() as f64;
    words
        .iter()
        .enumerate()
        .map(|(i, w)| TranscriptionWord {
            word: w.to_string(),
            start: step * i as f64,
            end: step * (i + 1) as f64,
        })
        .collect()
}
