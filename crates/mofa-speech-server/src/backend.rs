//! Assembles the coordinator from configuration: memory probe, monitor and
//! the two model adapters.

use std::sync::Arc;
use std::time::Duration;

use mofa_speech::adapter::{SimulatedAccelerator, SimulatedSttAdapter, SimulatedTtsAdapter};
use mofa_speech::config::{ProbeKind, SpeechConfig};
use mofa_speech::coordinator::ModelCoordinator;
use mofa_speech::monitor::{
    MemoryMonitor, MemoryProbe, NvidiaSmiProbe, SystemMemoryProbe, detect_probe,
};
use tracing::info;

/// Build a coordinator over the simulated backend.
///
/// The adapters always draw from the simulated accelerator; `monitor.probe`
/// only selects what the monitor reports.
pub fn build_coordinator(config: &SpeechConfig) -> ModelCoordinator {
    let sim = &config.simulated;
    let device = Arc::new(SimulatedAccelerator::new(
        sim.device_name.clone(),
        sim.device_total_bytes,
    ));

    let stt = Arc::new(SimulatedSttAdapter::new(
        config.models.stt.id.clone(),
        sim.stt_footprint_bytes,
        Duration::from_millis(sim.stt_load_latency_ms),
        device.clone(),
    ));
    let tts = Arc::new(SimulatedTtsAdapter::new(
        config.models.tts.id.clone(),
        sim.tts_footprint_bytes,
        Duration::from_millis(sim.tts_load_latency_ms),
        device.clone(),
    ));

    let probe: Arc<dyn MemoryProbe> = match config.monitor.probe {
        ProbeKind::Auto => detect_probe(),
        ProbeKind::Nvidia => Arc::new(NvidiaSmiProbe::default()),
        ProbeKind::System => Arc::new(SystemMemoryProbe::new()),
        ProbeKind::Simulated => device,
    };
    let monitor = Arc::new(MemoryMonitor::new(probe, config.monitor.settings()));

    info!(
        stt_model = %config.models.stt.id,
        tts_model = %config.models.tts.id,
        probe = ?config.monitor.probe,
        "speech backend assembled"
    );

    ModelCoordinator::new(stt, tts, monitor, config.coordinator.options())
}
