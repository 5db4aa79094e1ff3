//! Accelerator memory monitoring.
//!
//! [`MemoryMonitor`] wraps a [`MemoryProbe`] (NVIDIA, host RAM, or the
//! simulated device) and adds the bookkeeping the coordinator and the
//! metrics endpoint need:
//!
//! - a utilization warning threshold checked on every snapshot
//! - a leak-detection baseline, reset by the coordinator after each unload
//! - a bounded history of load/unload timings with aggregate statistics

pub mod probe;

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::ModelFamily;

pub use probe::{NvidiaSmiProbe, SystemMemoryProbe, detect_probe};

const MIB: f64 = 1024.0 * 1024.0;

/// Memory figures for the accelerator at one instant, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

impl MemorySnapshot {
    pub fn new(total_bytes: u64, used_bytes: u64) -> Self {
        Self {
            total_bytes,
            used_bytes,
            free_bytes: total_bytes.saturating_sub(used_bytes),
        }
    }

    pub fn utilization_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }

    pub fn used_mb(&self) -> f64 {
        self.used_bytes as f64 / MIB
    }

    pub fn total_mb(&self) -> f64 {
        self.total_bytes as f64 / MIB
    }

    pub fn free_mb(&self) -> f64 {
        self.free_bytes as f64 / MIB
    }
}

/// Identity of the device behind a probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `false` when no accelerator was found and the probe reports host RAM
    pub available: bool,
    pub device_name: String,
    pub backend: String,
    pub driver_version: Option<String>,
    pub device_count: u32,
}

impl DeviceInfo {
    pub fn unavailable(backend: &str) -> Self {
        Self {
            available: false,
            device_name: "No accelerator device".to_string(),
            backend: backend.to_string(),
            driver_version: None,
            device_count: 0,
        }
    }
}

/// Stateless source of memory figures. Implementations may block briefly
/// (e.g. spawn `nvidia-smi`); async callers should go through
/// `spawn_blocking`.
pub trait MemoryProbe: Send + Sync {
    fn snapshot(&self) -> MemorySnapshot;

    fn device(&self) -> DeviceInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchOperation {
    Load,
    Unload,
}

/// One timed load or unload, as recorded by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub timestamp: DateTime<Utc>,
    pub family: ModelFamily,
    pub operation: SwitchOperation,
    pub duration_secs: f64,
    pub succeeded: bool,
    pub memory_before: Option<MemorySnapshot>,
    pub memory_after: Option<MemorySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_switches: usize,
    pub total_loads: usize,
    pub total_unloads: usize,
    pub avg_load_time_seconds: f64,
    pub avg_unload_time_seconds: f64,
    pub recent_switches: Vec<SwitchRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakReport {
    pub leak_detected: bool,
    pub baseline_mb: f64,
    pub current_mb: f64,
    pub delta_mb: f64,
}

/// Tunables for [`MemoryMonitor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Utilization above which every snapshot logs a warning
    pub vram_threshold_percent: f64,
    /// Growth over the baseline that counts as a leak
    pub leak_threshold_bytes: u64,
    /// Switch records kept for statistics
    pub history_size: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            vram_threshold_percent: 90.0,
            leak_threshold_bytes: 100 * 1024 * 1024,
            history_size: 100,
        }
    }
}

const RECENT_SWITCHES: usize = 10;

pub struct MemoryMonitor {
    probe: Arc<dyn MemoryProbe>,
    settings: Mutex<MonitorSettings>,
    baseline: Mutex<Option<u64>>,
    history: Mutex<VecDeque<SwitchRecord>>,
    last_unload_report: Mutex<Option<LeakReport>>,
}

impl MemoryMonitor {
    pub fn new(probe: Arc<dyn MemoryProbe>, settings: MonitorSettings) -> Self {
        Self {
            probe,
            settings: Mutex::new(settings),
            baseline: Mutex::new(None),
            history: Mutex::new(VecDeque::new()),
            last_unload_report: Mutex::new(None),
        }
    }

    pub fn with_defaults(probe: Arc<dyn MemoryProbe>) -> Self {
        Self::new(probe, MonitorSettings::default())
    }

    /// Current memory figures. Logs a warning above the utilization threshold.
    pub fn snapshot(&self) -> MemorySnapshot {
        let snapshot = self.probe.snapshot();
        let threshold = self.settings.lock().vram_threshold_percent;
        let utilization = snapshot.utilization_percent();
        if utilization > threshold {
            warn!(
                utilization_percent = round2(utilization),
                threshold_percent = threshold,
                "accelerator memory usage exceeds threshold"
            );
        }
        snapshot
    }

    pub fn device(&self) -> DeviceInfo {
        self.probe.device()
    }

    /// Record the current usage as the new leak baseline and return it.
    pub fn reset_baseline(&self) -> u64 {
        let used = self.probe.snapshot().used_bytes;
        *self.baseline.lock() = Some(used);
        info!(baseline_mb = round2(used as f64 / MIB), "memory baseline reset");
        used
    }

    pub fn baseline_bytes(&self) -> Option<u64> {
        *self.baseline.lock()
    }

    /// Compare current usage against the baseline. The first call with no
    /// baseline establishes one and reports no leak.
    pub fn detect_leak(&self) -> LeakReport {
        let current = self.probe.snapshot().used_bytes;
        let threshold = self.settings.lock().leak_threshold_bytes;

        let baseline = {
            let mut guard = self.baseline.lock();
            match *guard {
                Some(b) => b,
                None => {
                    *guard = Some(current);
                    current
                }
            }
        };

        let delta = current as i128 - baseline as i128;
        let leak_detected = delta > threshold as i128;
        if leak_detected {
            warn!(
                baseline_mb = round2(baseline as f64 / MIB),
                current_mb = round2(current as f64 / MIB),
                delta_mb = round2(delta as f64 / MIB),
                "potential accelerator memory leak detected"
            );
        }

        LeakReport {
            leak_detected,
            baseline_mb: round2(baseline as f64 / MIB),
            current_mb: round2(current as f64 / MIB),
            delta_mb: round2(delta as f64 / MIB),
        }
    }

    /// Called right after a successful unload: compares the residual usage
    /// with the pre-load baseline, keeps the report for the metrics
    /// endpoint, then re-baselines. A residual above the leak threshold is
    /// logged, never raised.
    pub fn settle_after_unload(&self) -> LeakReport {
        let report = self.detect_leak();
        *self.last_unload_report.lock() = Some(report.clone());
        self.reset_baseline();
        report
    }

    /// Residual check recorded by the most recent unload, if any.
    pub fn last_unload_report(&self) -> Option<LeakReport> {
        self.last_unload_report.lock().clone()
    }

    pub fn record_switch(&self, record: SwitchRecord) {
        let capacity = self.settings.lock().history_size.max(1);
        info!(
            family = %record.family,
            operation = ?record.operation,
            duration_secs = round3(record.duration_secs),
            succeeded = record.succeeded,
            used_mb = record.memory_after.map(|m| round2(m.used_mb())).unwrap_or_default(),
            "model switch tracked"
        );
        let mut history = self.history.lock();
        history.push_back(record);
        while history.len() > capacity {
            history.pop_front();
        }
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        let history = self.history.lock();

        let durations = |op: SwitchOperation| -> Vec<f64> {
            history
                .iter()
                .filter(|r| r.operation == op)
                .map(|r| r.duration_secs)
                .collect()
        };
        let loads = durations(SwitchOperation::Load);
        let unloads = durations(SwitchOperation::Unload);

        let skip = history.len().saturating_sub(RECENT_SWITCHES);
        PerformanceStats {
            total_switches: history.len(),
            total_loads: loads.len(),
            total_unloads: unloads.len(),
            avg_load_time_seconds: round3(mean(&loads)),
            avg_unload_time_seconds: round3(mean(&unloads)),
            recent_switches: history.iter().skip(skip).cloned().collect(),
        }
    }

    /// Change the utilization warning threshold. Rejects values outside 0–100.
    pub fn set_vram_threshold(&self, percent: f64) -> bool {
        if !(0.0..=100.0).contains(&percent) {
            warn!(percent, "invalid VRAM threshold, must be 0-100");
            return false;
        }
        self.settings.lock().vram_threshold_percent = percent;
        info!(percent, "VRAM threshold updated");
        true
    }

    pub fn settings(&self) -> MonitorSettings {
        self.settings.lock().clone()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
