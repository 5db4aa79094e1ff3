//! Common test utilities shared across `mofa-speech` integration tests.
//!
//! Not a standalone test binary; declare it with `mod common;` inside each
//! integration test file that needs it.

pub mod mock_adapter;

use std::sync::Arc;
use std::time::Duration;

use mofa_speech::adapter::SimulatedAccelerator;
use mofa_speech::coordinator::{CoordinatorOptions, ModelCoordinator};
use mofa_speech::monitor::MemoryMonitor;

use mock_adapter::MockAdapter;

/// Coordinator over two mocks with a roomy simulated device as the memory
/// probe (the mocks do not allocate from it).
pub fn coordinator(
    stt: &Arc<MockAdapter>,
    tts: &Arc<MockAdapter>,
    switch_timeout: Duration,
) -> ModelCoordinator {
    let device = Arc::new(SimulatedAccelerator::new("test-device", 8 << 30));
    let monitor = Arc::new(MemoryMonitor::with_defaults(device));
    ModelCoordinator::new(
        stt.clone(),
        tts.clone(),
        monitor,
        CoordinatorOptions::default().with_switch_timeout(switch_timeout),
    )
}
