//! Recording mock adapter for coordinator integration tests.
//!
//! Both mocks of a test share one [`Ledger`], which records lifecycle events
//! in global order and tracks how many adapters were loaded at the same
//! time. That makes ordering and mutual-exclusion properties directly
//! assertable.
//!
//! ```rust,ignore
//! let ledger = Ledger::new();
//! let stt = MockAdapter::builder(ModelFamily::Stt).build(&ledger);
//! let tts = MockAdapter::builder(ModelFamily::Tts)
//!     .load_delay(Duration::from_millis(50))
//!     .fail_next_loads(1)
//!     .build(&ledger);
//! let slow = MockAdapter::builder(ModelFamily::Tts)
//!     .block_first_load(Duration::from_millis(300))
//!     .build(&ledger);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use mofa_speech::adapter::{
    ModelAdapter, SpeechRequest, SpeechToText, SynthesizedAudio, TextToSpeech, Transcription,
    TranscriptionRequest,
};
use mofa_speech::error::{AdapterError, AdapterResult};
use mofa_speech::types::ModelFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    LoadStarted(ModelFamily),
    Loaded(ModelFamily),
    LoadFailed(ModelFamily),
    Unloaded(ModelFamily),
    InferenceFinished(ModelFamily),
}

#[derive(Default)]
struct LedgerState {
    events: Vec<Event>,
    loaded: HashSet<ModelFamily>,
    peak_loaded: usize,
}

/// Shared event log for a pair of mocks.
#[derive(Clone, Default)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    /// Largest number of simultaneously loaded adapters ever observed.
    pub fn peak_loaded(&self) -> usize {
        self.state.lock().unwrap().peak_loaded
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        self.events().iter().position(|e| *e == event)
    }

    fn push(&self, event: Event) {
        self.state.lock().unwrap().events.push(event);
    }

    fn mark_loaded(&self, family: ModelFamily) {
        let mut state = self.state.lock().unwrap();
        state.loaded.insert(family);
        state.peak_loaded = state.peak_loaded.max(state.loaded.len());
        state.events.push(Event::Loaded(family));
    }

    fn mark_unloaded(&self, family: ModelFamily) {
        let mut state = self.state.lock().unwrap();
        state.loaded.remove(&family);
        state.events.push(Event::Unloaded(family));
    }
}

pub struct MockAdapterBuilder {
    family: ModelFamily,
    load_delay: Duration,
    inference_delay: Duration,
    hang_on_load: bool,
    blocking_load: Option<Duration>,
    fail_loads: u32,
    fail_unload: bool,
}

impl MockAdapterBuilder {
    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn inference_delay(mut self, delay: Duration) -> Self {
        self.inference_delay = delay;
        self
    }

    /// `load()` stalls until `set_hang_on_load(false)`
    pub fn hang_on_load(mut self) -> Self {
        self.hang_on_load = true;
        self
    }

    /// The first `load()` does its work on a blocking thread for `duration`,
    /// so aborting the calling task does not stop it.
    pub fn block_first_load(mut self, duration: Duration) -> Self {
        self.blocking_load = Some(duration);
        self
    }

    /// The next `n` loads fail after their delay
    pub fn fail_next_loads(mut self, n: u32) -> Self {
        self.fail_loads = n;
        self
    }

    pub fn fail_unload(mut self) -> Self {
        self.fail_unload = true;
        self
    }

    pub fn build(self, ledger: &Ledger) -> Arc<MockAdapter> {
        Arc::new(MockAdapter {
            family: self.family,
            name: format!("mock-{}", self.family),
            ledger: ledger.clone(),
            load_delay: self.load_delay,
            inference_delay: self.inference_delay,
            hang_on_load: AtomicBool::new(self.hang_on_load),
            blocking_load: Mutex::new(self.blocking_load),
            failures_left: AtomicU32::new(self.fail_loads),
            fail_unload: AtomicBool::new(self.fail_unload),
            loaded: Arc::new(AtomicBool::new(false)),
            load_calls: AtomicU32::new(0),
            unload_calls: AtomicU32::new(0),
        })
    }
}

/// Test double implementing both inference traits; `family` decides which
/// one the coordinator uses.
pub struct MockAdapter {
    family: ModelFamily,
    name: String,
    ledger: Ledger,
    load_delay: Duration,
    inference_delay: Duration,
    hang_on_load: AtomicBool,
    blocking_load: Mutex<Option<Duration>>,
    failures_left: AtomicU32,
    fail_unload: AtomicBool,
    loaded: Arc<AtomicBool>,
    load_calls: AtomicU32,
    unload_calls: AtomicU32,
}

impl MockAdapter {
    pub fn builder(family: ModelFamily) -> MockAdapterBuilder {
        MockAdapterBuilder {
            family,
            load_delay: Duration::from_millis(5),
            inference_delay: Duration::ZERO,
            hang_on_load: false,
            blocking_load: None,
            fail_loads: 0,
            fail_unload: false,
        }
    }

    /// Number of `load()` calls that actually started loading.
    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn unload_calls(&self) -> u32 {
        self.unload_calls.load(Ordering::SeqCst)
    }

    pub fn is_loaded_now(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn set_hang_on_load(&self, hang: bool) {
        self.hang_on_load.store(hang, Ordering::SeqCst);
    }

    pub fn set_fail_unload(&self, fail: bool) {
        self.fail_unload.store(fail, Ordering::SeqCst);
    }

    async fn run_inference(&self) -> AdapterResult<()> {
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(AdapterError::NotLoaded);
        }
        tokio::time::sleep(self.inference_delay).await;
        self.ledger.push(Event::InferenceFinished(self.family));
        Ok(())
    }
}

#[async_trait]
impl ModelAdapter for MockAdapter {
    fn family(&self) -> ModelFamily {
        self.family
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> AdapterResult<()> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.ledger.push(Event::LoadStarted(self.family));

        let blocking = self.blocking_load.lock().unwrap().take();
        if let Some(duration) = blocking {
            let loaded = self.loaded.clone();
            let ledger = self.ledger.clone();
            let family = self.family;
            return tokio::task::spawn_blocking(move || {
                std::thread::sleep(duration);
                loaded.store(true, Ordering::SeqCst);
                ledger.mark_loaded(family);
            })
            .await
            .map_err(|e| AdapterError::Load(e.to_string()));
        }

        while self.hang_on_load.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(self.load_delay).await;

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            self.ledger.push(Event::LoadFailed(self.family));
            return Err(AdapterError::Load("injected load failure".to_string()));
        }

        self.loaded.store(true, Ordering::SeqCst);
        self.ledger.mark_loaded(self.family);
        Ok(())
    }

    async fn unload(&self) -> AdapterResult<()> {
        self.unload_calls.fetch_add(1, Ordering::SeqCst);
        if !self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.fail_unload.load(Ordering::SeqCst) {
            return Err(AdapterError::Unload("injected unload failure".to_string()));
        }
        self.loaded.store(false, Ordering::SeqCst);
        self.ledger.mark_unloaded(self.family);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for MockAdapter {
    async fn transcribe(&self, _request: TranscriptionRequest) -> AdapterResult<Transcription> {
        self.run_inference().await?;
        Ok(Transcription {
            text: "mock transcript".to_string(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl TextToSpeech for MockAdapter {
    async fn synthesize(&self, request: SpeechRequest) -> AdapterResult<SynthesizedAudio> {
        self.run_inference().await?;
        Ok(SynthesizedAudio {
            bytes: vec![0; 4],
            format: request.format,
            sample_rate: 24_000,
        })
    }
}
