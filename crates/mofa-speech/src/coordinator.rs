//! ModelCoordinator - exclusive lifecycle control of the accelerator slot
//!
//! The device fits exactly one model family at a time. The coordinator owns
//! both adapters and is the only component that may load or unload them:
//!
//! - at most one family is resident; the other is unloaded *before* the new
//!   load begins, never interleaved
//! - every transition (unload-then-load) runs under one coordinator-wide
//!   lock, so concurrent callers never interleave transitions and callers
//!   wanting the family already being loaded wait for that load instead of
//!   starting a second one
//! - the whole transition is bounded by a deadline; on expiry the slot is
//!   marked `Failed` and no partially loaded handle escapes
//! - a lifecycle call that outlives its deadline keeps running; the next
//!   transition waits for it and discards what it loaded before anything
//!   else is loaded
//! - `current_status()` reads a snapshot behind a short-lived lock and is
//!   never blocked by a slow load
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mofa_speech::adapter::{SimulatedAccelerator, SimulatedSttAdapter, SimulatedTtsAdapter};
//! use mofa_speech::coordinator::{CoordinatorOptions, ModelCoordinator};
//! use mofa_speech::monitor::MemoryMonitor;
//! use mofa_speech::types::ModelFamily;
//!
//! # async fn run() -> mofa_speech::error::Result<()> {
//! let device = Arc::new(SimulatedAccelerator::new("sim", 4 << 30));
//! let stt = Arc::new(SimulatedSttAdapter::new("asr", 2 << 30, Duration::ZERO, device.clone()));
//! let tts = Arc::new(SimulatedTtsAdapter::new("tts", 3 << 30, Duration::ZERO, device.clone()));
//! let monitor = Arc::new(MemoryMonitor::with_defaults(device));
//!
//! let coordinator = ModelCoordinator::new(stt, tts, monitor, CoordinatorOptions::default());
//! let handle = coordinator.acquire(ModelFamily::Tts).await?;
//! assert_eq!(handle.family(), ModelFamily::Tts);
//! coordinator.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::{Mutex, OwnedRwLockReadGuard, RwLock as AsyncRwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

use crate::adapter::{
    Adapter, SpeechRequest, SpeechToText, SynthesizedAudio, TextToSpeech, Transcription,
    TranscriptionRequest,
};
use crate::error::{AdapterError, AdapterResult, CoordinatorError, Result};
use crate::monitor::{MemoryMonitor, MemorySnapshot, SwitchOperation, SwitchRecord};
use crate::types::{CoordinatorStatus, LifecycleState, ModelFamily};

/// Construction options for [`ModelCoordinator`]
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Deadline for the whole unload-then-load sequence
    pub switch_timeout: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            switch_timeout: Duration::from_secs(30),
        }
    }
}

impl CoordinatorOptions {
    pub fn with_switch_timeout(mut self, timeout: Duration) -> Self {
        self.switch_timeout = timeout;
        self
    }
}

/// The single mutable aggregate. Mutated only while the transition lock is
/// held; read by anyone through `current_status()`.
#[derive(Debug, Default)]
struct SlotState {
    family: ModelFamily,
    lifecycle: LifecycleState,
    /// Present iff `lifecycle == Resident`
    handle: Option<Adapter>,
    model_label: Option<String>,
    last_transition: Option<chrono::DateTime<Utc>>,
    generation: u64,
}

impl SlotState {
    fn snapshot(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            family: self.family,
            lifecycle: self.lifecycle,
            model_label: self.model_label.clone(),
            last_transition: self.last_transition,
            generation: self.generation,
        }
    }

    fn begin(&mut self, family: ModelFamily, lifecycle: LifecycleState, label: Option<String>) {
        self.family = family;
        self.lifecycle = lifecycle;
        self.handle = None;
        self.model_label = label;
        self.generation += 1;
    }

    fn settle(&mut self, lifecycle: LifecycleState) {
        debug_assert!(matches!(lifecycle, LifecycleState::Idle | LifecycleState::Failed));
        self.family = ModelFamily::None;
        self.lifecycle = lifecycle;
        self.handle = None;
        self.model_label = None;
        self.last_transition = Some(Utc::now());
    }
}

enum PhaseOutcome {
    Done,
    Failed(AdapterError),
    /// Still running; the task is handed back so it can be tracked
    TimedOut(JoinHandle<AdapterResult<()>>),
}

/// A load or unload that missed its deadline. Adapters may do their work on
/// a blocking thread, which no abort can stop, so the task is kept until it
/// finishes and its effect is undone by the next transition.
struct Straggler {
    family: ModelFamily,
    operation: SwitchOperation,
    task: JoinHandle<AdapterResult<()>>,
}

/// Exclusive owner of the STT and TTS adapters.
///
/// Construct one per process and share it behind an `Arc`.
pub struct ModelCoordinator {
    stt: Adapter,
    tts: Adapter,
    monitor: Arc<MemoryMonitor>,
    options: CoordinatorOptions,
    /// Serializes transitions system-wide
    transition: Mutex<()>,
    /// Read by inference through a handle, written while a transition runs,
    /// so the resident model is never unloaded under an in-flight call
    inference_gate: Arc<AsyncRwLock<()>>,
    slot: Arc<RwLock<SlotState>>,
    /// Timed-out adapter calls; only touched under the transition lock
    stragglers: SyncMutex<Vec<Straggler>>,
}

impl ModelCoordinator {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
        monitor: Arc<MemoryMonitor>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            stt: Adapter::Stt(stt),
            tts: Adapter::Tts(tts),
            monitor,
            options,
            transition: Mutex::new(()),
            inference_gate: Arc::new(AsyncRwLock::new(())),
            slot: Arc::new(RwLock::new(SlotState::default())),
            stragglers: SyncMutex::new(Vec::new()),
        }
    }

    /// Startup hook: establish the memory baseline and optionally preload a
    /// family. A preload failure is logged and swallowed; the first real
    /// request retries the transition.
    pub async fn initialize(&self, preload: ModelFamily) {
        info!(
            switch_timeout_secs = self.options.switch_timeout.as_secs_f64(),
            "initializing model coordinator"
        );
        let monitor = self.monitor.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || monitor.reset_baseline()).await {
            warn!(error = %e, "memory baseline task failed");
        }

        if !preload.is_loadable() {
            info!("no model preloading configured");
            return;
        }

        info!(family = %preload, "preloading model");
        if let Err(e) = self.acquire(preload).await {
            warn!(family = %preload, error = %e, "model preload failed, continuing without it");
        }
    }

    /// Make `family` resident and return a handle to it.
    ///
    /// Fast path: the family is already resident, no adapter is touched.
    /// Otherwise the caller takes the transition lock, unloads whatever else
    /// occupies the slot, and loads `family`, all within the switch deadline.
    ///
    /// The returned handle does not pin the slot: another family may be
    /// switched in before it is used, and it then fails with
    /// [`CoordinatorError::NotResident`]. Use [`acquire_lease`] to run
    /// inference without that window.
    ///
    /// [`acquire_lease`]: ModelCoordinator::acquire_lease
    pub async fn acquire(&self, family: ModelFamily) -> Result<AdapterHandle> {
        self.acquire_lease(family).await.map(AdapterLease::into_handle)
    }

    /// Like [`acquire`](ModelCoordinator::acquire), but the slot stays pinned
    /// to `family` until the lease is dropped. Switches to another family wait
    /// for outstanding leases.
    ///
    /// Do not hold a lease while acquiring another family from the same task;
    /// the switch would wait on the lease forever.
    pub async fn acquire_lease(&self, family: ModelFamily) -> Result<AdapterLease> {
        if !family.is_loadable() {
            return Err(CoordinatorError::InvalidFamily(family));
        }

        // Residency only changes under the write side of the gate, so a
        // check made while holding a read lease stays true.
        if self.resident_handle(family).is_some() {
            let lease = self.inference_gate.clone().read_owned().await;
            if let Some(handle) = self.resident_handle(family) {
                return Ok(AdapterLease { handle, lease });
            }
        }

        let _transition = self.transition.lock().await;

        // Whoever held the lock before us may have loaded this family.
        if let Some(handle) = self.resident_handle(family) {
            debug!(family = %family, "model became resident while waiting");
            let lease = self.inference_gate.clone().read_owned().await;
            return Ok(AdapterLease { handle, lease });
        }

        let drain = self.inference_gate.clone().write_owned().await;
        let handle = self.switch_to(family).await?;
        Ok(AdapterLease {
            handle,
            lease: drain.downgrade(),
        })
    }

    /// Status snapshot for health and metrics readers. Never waits on a
    /// transition.
    pub fn current_status(&self) -> CoordinatorStatus {
        self.slot.read().snapshot()
    }

    /// Unload `family` if it is the resident one. Serialized with
    /// transitions like `acquire`.
    pub async fn unload(&self, family: ModelFamily) -> Result<()> {
        let _transition = self.transition.lock().await;
        let _drain = self.inference_gate.write().await;

        let resident = {
            let slot = self.slot.read();
            slot.lifecycle == LifecycleState::Resident && slot.family == family
        };
        if !resident {
            debug!(family = %family, "unload requested for non-resident family");
            return Ok(());
        }

        let deadline = Instant::now() + self.options.switch_timeout;
        let adapter = self.adapter(family).clone();
        self.unload_phase(&adapter, family, deadline).await
    }

    /// Unconditionally unload everything and return to `Idle`. Idempotent,
    /// and succeeds regardless of how the last transition ended.
    pub async fn shutdown(&self) {
        info!("shutting down model coordinator");
        let _transition = self.transition.lock().await;
        let _drain = self.inference_gate.write().await;

        let deadline = Instant::now() + self.options.switch_timeout;
        for straggler in self.await_stragglers(deadline).await {
            warn!(
                family = %straggler.family,
                operation = ?straggler.operation,
                "abandoning unfinished adapter call at shutdown"
            );
            straggler.task.abort();
        }

        let resident_family = self.slot.read().family;
        for adapter in [&self.stt, &self.tts] {
            if !adapter.is_loaded() && adapter.family() != resident_family {
                continue;
            }
            let deadline = Instant::now() + self.options.switch_timeout;
            match run_phase(adapter.clone(), SwitchOperation::Unload, deadline).await {
                PhaseOutcome::Done => {
                    info!(family = %adapter.family(), "model unloaded during shutdown")
                }
                PhaseOutcome::Failed(e) => {
                    error!(family = %adapter.family(), error = %e, "unload failed during shutdown")
                }
                PhaseOutcome::TimedOut(task) => {
                    task.abort();
                    error!(family = %adapter.family(), "unload timed out during shutdown")
                }
            }
        }

        {
            let mut slot = self.slot.write();
            slot.generation += 1;
            slot.settle(LifecycleState::Idle);
        }
        self.settle_memory().await;
        info!("model coordinator shutdown complete");
    }

    pub fn monitor(&self) -> &Arc<MemoryMonitor> {
        &self.monitor
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Model identifier configured for `family`.
    pub fn model_name(&self, family: ModelFamily) -> Option<&str> {
        match family {
            ModelFamily::Stt => Some(self.stt.model_name()),
            ModelFamily::Tts => Some(self.tts.model_name()),
            ModelFamily::None => None,
        }
    }

    // Internal methods

    fn adapter(&self, family: ModelFamily) -> &Adapter {
        match family {
            ModelFamily::Tts => &self.tts,
            _ => &self.stt,
        }
    }

    fn resident_handle(&self, family: ModelFamily) -> Option<AdapterHandle> {
        let slot = self.slot.read();
        if slot.lifecycle != LifecycleState::Resident || slot.family != family {
            return None;
        }
        slot.handle.as_ref().map(|adapter| AdapterHandle {
            family,
            generation: slot.generation,
            adapter: adapter.clone(),
            slot: self.slot.clone(),
            gate: self.inference_gate.clone(),
        })
    }

    /// The transition proper. Caller holds the transition lock and the
    /// inference gate.
    async fn switch_to(&self, family: ModelFamily) -> Result<AdapterHandle> {
        let started = std::time::Instant::now();
        let deadline = Instant::now() + self.options.switch_timeout;
        info!(family = %family, "switching model");

        self.settle_stragglers(family, deadline).await?;

        // Free the slot: the committed family plus anything that still
        // reports loaded, e.g. a load that finished after its deadline. Such
        // a late load is discarded even when it is the requested family.
        let committed = self.slot.read().family;
        let to_unload: Vec<Adapter> = [&self.stt, &self.tts]
            .into_iter()
            .filter(|a| a.family() == committed || a.is_loaded())
            .cloned()
            .collect();
        for adapter in &to_unload {
            let owner = adapter.family();
            if owner != committed {
                warn!(family = %owner, "discarding stray loaded model");
            }
            self.unload_phase(adapter, family, deadline).await?;
        }

        self.load_phase(family, deadline).await?;

        info!(
            family = %family,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model switch complete"
        );
        self.resident_handle(family)
            .ok_or(CoordinatorError::NotResident { family })
    }

    /// Wait, up to `deadline`, for adapter calls left over from timed-out
    /// phases. Returns the ones still running; they are no longer tracked.
    async fn await_stragglers(&self, deadline: Instant) -> Vec<Straggler> {
        let pending = std::mem::take(&mut *self.stragglers.lock());
        let mut unfinished = Vec::new();
        for mut straggler in pending {
            match timeout_at(deadline, &mut straggler.task).await {
                Ok(joined) => {
                    let succeeded = matches!(joined, Ok(Ok(())));
                    info!(
                        family = %straggler.family,
                        operation = ?straggler.operation,
                        succeeded,
                        "late adapter call finished, discarding its result"
                    );
                }
                Err(_) => unfinished.push(straggler),
            }
        }
        unfinished
    }

    /// No load may start while an earlier call could still change what is
    /// resident. If one is still running at `deadline` the switch fails and
    /// the call stays tracked for the next attempt.
    async fn settle_stragglers(&self, requested: ModelFamily, deadline: Instant) -> Result<()> {
        let unfinished = self.await_stragglers(deadline).await;
        if unfinished.is_empty() {
            return Ok(());
        }

        for straggler in &unfinished {
            error!(
                family = %straggler.family,
                operation = ?straggler.operation,
                "earlier adapter call still running, refusing to switch"
            );
        }
        self.stragglers.lock().extend(unfinished);
        self.slot.write().settle(LifecycleState::Failed);
        Err(CoordinatorError::SwitchTimeout {
            family: requested,
            timeout: self.options.switch_timeout,
        })
    }

    fn park(
        &self,
        family: ModelFamily,
        operation: SwitchOperation,
        task: JoinHandle<AdapterResult<()>>,
    ) {
        self.stragglers.lock().push(Straggler {
            family,
            operation,
            task,
        });
    }

    /// `requested` is the family the caller is switching to, used to tag a
    /// timeout error.
    async fn unload_phase(
        &self,
        adapter: &Adapter,
        requested: ModelFamily,
        deadline: Instant,
    ) -> Result<()> {
        let family = adapter.family();
        let label = Some(adapter.model_name().to_string());
        self.slot
            .write()
            .begin(family, LifecycleState::Unloading, label);

        let before = self.memory_snapshot().await;
        let started = std::time::Instant::now();
        info!(family = %family, "unloading model");

        let outcome = run_phase(adapter.clone(), SwitchOperation::Unload, deadline).await;
        let elapsed = started.elapsed();
        let after = self.memory_snapshot().await;
        self.record(family, SwitchOperation::Unload, elapsed, &outcome, before, after);

        match outcome {
            PhaseOutcome::Done => {
                self.slot.write().settle(LifecycleState::Idle);
                info!(
                    family = %family,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "model unloaded"
                );
                self.settle_memory().await;
                Ok(())
            }
            PhaseOutcome::Failed(source) => {
                self.slot.write().settle(LifecycleState::Failed);
                error!(family = %family, error = %source, "model unload failed");
                Err(CoordinatorError::UnloadFailed { family, source })
            }
            PhaseOutcome::TimedOut(task) => {
                self.park(family, SwitchOperation::Unload, task);
                self.slot.write().settle(LifecycleState::Failed);
                error!(
                    family = %family,
                    timeout_secs = self.options.switch_timeout.as_secs_f64(),
                    "model unload exceeded switch deadline"
                );
                Err(CoordinatorError::SwitchTimeout {
                    family: requested,
                    timeout: self.options.switch_timeout,
                })
            }
        }
    }

    async fn load_phase(&self, family: ModelFamily, deadline: Instant) -> Result<()> {
        let adapter = self.adapter(family).clone();
        let label = Some(adapter.model_name().to_string());
        self.slot
            .write()
            .begin(family, LifecycleState::Loading, label.clone());

        let before = self.memory_snapshot().await;
        let started = std::time::Instant::now();
        info!(family = %family, model = ?label, "loading model");

        let outcome = run_phase(adapter.clone(), SwitchOperation::Load, deadline).await;
        let elapsed = started.elapsed();
        let after = self.memory_snapshot().await;
        self.record(family, SwitchOperation::Load, elapsed, &outcome, before, after);

        match outcome {
            PhaseOutcome::Done => {
                let mut slot = self.slot.write();
                slot.lifecycle = LifecycleState::Resident;
                slot.handle = Some(adapter);
                slot.last_transition = Some(Utc::now());
                info!(
                    family = %family,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "model loaded"
                );
                Ok(())
            }
            PhaseOutcome::Failed(source) => {
                self.slot.write().settle(LifecycleState::Failed);
                error!(family = %family, error = %source, "model load failed");
                Err(CoordinatorError::LoadFailed { family, source })
            }
            PhaseOutcome::TimedOut(task) => {
                // Never installed. The next transition waits for it and
                // unloads whatever it managed to load.
                self.park(family, SwitchOperation::Load, task);
                self.slot.write().settle(LifecycleState::Failed);
                error!(
                    family = %family,
                    timeout_secs = self.options.switch_timeout.as_secs_f64(),
                    "model load exceeded switch deadline"
                );
                Err(CoordinatorError::SwitchTimeout {
                    family,
                    timeout: self.options.switch_timeout,
                })
            }
        }
    }

    fn record(
        &self,
        family: ModelFamily,
        operation: SwitchOperation,
        elapsed: Duration,
        outcome: &PhaseOutcome,
        memory_before: Option<MemorySnapshot>,
        memory_after: Option<MemorySnapshot>,
    ) {
        self.monitor.record_switch(SwitchRecord {
            timestamp: Utc::now(),
            family,
            operation,
            duration_secs: elapsed.as_secs_f64(),
            succeeded: matches!(outcome, PhaseOutcome::Done),
            memory_before,
            memory_after,
        });
    }

    async fn memory_snapshot(&self) -> Option<MemorySnapshot> {
        let monitor = self.monitor.clone();
        tokio::task::spawn_blocking(move || monitor.snapshot())
            .await
            .ok()
    }

    /// Post-unload residual check and baseline reset.
    async fn settle_memory(&self) {
        let monitor = self.monitor.clone();
        match tokio::task::spawn_blocking(move || monitor.settle_after_unload()).await {
            Ok(report) if report.leak_detected => warn!(
                residual_mb = report.delta_mb,
                "accelerator memory did not return to baseline after unload"
            ),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "memory settle task failed"),
        }
    }
}

/// Run one adapter lifecycle call in its own task, bounded by `deadline`.
///
/// The call runs on a separate task so that an adapter blocking its worker
/// thread cannot hold the caller past the deadline. On expiry the task is
/// returned still running; aborting it would not stop work an adapter has
/// moved to a blocking thread, only hide when that work ends.
async fn run_phase(adapter: Adapter, operation: SwitchOperation, deadline: Instant) -> PhaseOutcome {
    let mut task = tokio::spawn(async move {
        match operation {
            SwitchOperation::Load => adapter.load().await,
            SwitchOperation::Unload => adapter.unload().await,
        }
    });

    match timeout_at(deadline, &mut task).await {
        Ok(Ok(Ok(()))) => PhaseOutcome::Done,
        Ok(Ok(Err(e))) => PhaseOutcome::Failed(e),
        Ok(Err(join)) => {
            let reason = format!("adapter task aborted: {join}");
            PhaseOutcome::Failed(match operation {
                SwitchOperation::Load => AdapterError::Load(reason),
                SwitchOperation::Unload => AdapterError::Unload(reason),
            })
        }
        Err(_) => PhaseOutcome::TimedOut(task),
    }
}

/// Access to a resident adapter, valid for one residency generation.
///
/// Inference through a stale handle (the slot has since switched or failed)
/// is rejected with [`CoordinatorError::NotResident`]; the caller must
/// `acquire` again.
#[derive(Clone)]
pub struct AdapterHandle {
    family: ModelFamily,
    generation: u64,
    adapter: Adapter,
    slot: Arc<RwLock<SlotState>>,
    gate: Arc<AsyncRwLock<()>>,
}

impl AdapterHandle {
    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn model_name(&self) -> &str {
        self.adapter.model_name()
    }

    /// `true` while the slot still holds this handle's residency.
    pub fn is_current(&self) -> bool {
        let slot = self.slot.read();
        slot.lifecycle == LifecycleState::Resident
            && slot.family == self.family
            && slot.generation == self.generation
    }

    fn ensure_current(&self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(CoordinatorError::NotResident {
                family: self.family,
            })
        }
    }

    pub async fn transcribe(&self, request: TranscriptionRequest) -> Result<Transcription> {
        let _lease = self.gate.read().await;
        self.transcribe_leased(request).await
    }

    pub async fn synthesize(&self, request: SpeechRequest) -> Result<SynthesizedAudio> {
        let _lease = self.gate.read().await;
        self.synthesize_leased(request).await
    }

    /// Caller holds a read lease on the gate.
    async fn transcribe_leased(&self, request: TranscriptionRequest) -> Result<Transcription> {
        self.ensure_current()?;
        match &self.adapter {
            Adapter::Stt(stt) => stt
                .transcribe(request)
                .await
                .map_err(|source| CoordinatorError::Inference {
                    family: ModelFamily::Stt,
                    source,
                }),
            Adapter::Tts(_) => Err(CoordinatorError::NotResident {
                family: ModelFamily::Stt,
            }),
        }
    }

    async fn synthesize_leased(&self, request: SpeechRequest) -> Result<SynthesizedAudio> {
        self.ensure_current()?;
        match &self.adapter {
            Adapter::Tts(tts) => tts
                .synthesize(request)
                .await
                .map_err(|source| CoordinatorError::Inference {
                    family: ModelFamily::Tts,
                    source,
                }),
            Adapter::Stt(_) => Err(CoordinatorError::NotResident {
                family: ModelFamily::Tts,
            }),
        }
    }
}

/// A handle whose family stays resident for as long as the lease lives.
pub struct AdapterLease {
    handle: AdapterHandle,
    lease: OwnedRwLockReadGuard<()>,
}

impl AdapterLease {
    pub fn handle(&self) -> &AdapterHandle {
        &self.handle
    }

    /// Give up the lease, keeping an unpinned handle.
    pub fn into_handle(self) -> AdapterHandle {
        let Self { handle, lease } = self;
        drop(lease);
        handle
    }

    pub async fn transcribe(&self, request: TranscriptionRequest) -> Result<Transcription> {
        self.handle.transcribe_leased(request).await
    }

    pub async fn synthesize(&self, request: SpeechRequest) -> Result<SynthesizedAudio> {
        self.handle.synthesize_leased(request).await
    }
}

impl std::fmt::Debug for AdapterLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AdapterLease").field(&self.handle).finish()
    }
}

impl PartialEq for AdapterHandle {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family && self.generation == other.generation
    }
}

impl std::fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("family", &self.family)
            .field("generation", &self.generation)
            .field("model", &self.adapter.model_name())
            .finish()
    }
}
