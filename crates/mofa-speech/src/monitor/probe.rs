//! Concrete memory probes.
//!
//! Detection uses device-node checks and the vendor CLI rather than linking
//! to GPU libraries at compile time, so the crate builds the same way on
//! machines with and without an accelerator.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use parking_lot::Mutex;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, warn};

use super::{DeviceInfo, MemoryProbe, MemorySnapshot};

const MIB: u64 = 1024 * 1024;

/// NVIDIA accelerator probe backed by `nvidia-smi`.
///
/// Reports device `index` (default 0). Every call shells out, so keep it off
/// async worker threads.
#[derive(Debug, Clone)]
pub struct NvidiaSmiProbe {
    index: u32,
}

/// One row of `nvidia-smi --query-gpu=name,memory.total,memory.used,memory.free,driver_version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NvidiaSmiRow {
    pub name: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub driver_version: Option<String>,
}

impl NvidiaSmiProbe {
    pub fn new(index: u32) -> Self {
        Self { index }
    }

    /// `true` when the NVIDIA kernel module is loaded and `nvidia-smi` answers.
    pub fn is_available() -> bool {
        if !Path::new("/dev/nvidia0").exists() {
            return false;
        }
        Command::new("nvidia-smi")
            .arg("-L")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn query(&self) -> Option<(NvidiaSmiRow, u32)> {
        let output = Command::new("nvidia-smi")
            .args([
                "--query-gpu=name,memory.total,memory.used,memory.free,driver_version",
                "--format=csv,noheader,nounits",
            ])
            .output()
            .ok()?;

        if !output.status.success() {
            warn!(status = ?output.status, "nvidia-smi query failed");
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let rows: Vec<NvidiaSmiRow> = stdout.lines().filter_map(parse_nvidia_smi_row).collect();
        let count = rows.len() as u32;
        rows.into_iter().nth(self.index as usize).map(|row| (row, count))
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MemoryProbe for NvidiaSmiProbe {
    fn snapshot(&self) -> MemorySnapshot {
        match self.query() {
            Some((row, _)) => MemorySnapshot {
                total_bytes: row.total_bytes,
                used_bytes: row.used_bytes,
                free_bytes: row.free_bytes,
            },
            None => MemorySnapshot::default(),
        }
    }

    fn device(&self) -> DeviceInfo {
        match self.query() {
            Some((row, count)) => DeviceInfo {
                available: true,
                device_name: row.name,
                backend: "cuda".to_string(),
                driver_version: row.driver_version,
                device_count: count,
            },
            None => DeviceInfo::unavailable("cuda"),
        }
    }
}

/// Parse one CSV row (`nounits`, so memory is in MiB).
pub fn parse_nvidia_smi_row(line: &str) -> Option<NvidiaSmiRow> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        return None;
    }
    let mib = |s: &str| s.parse::<u64>().ok().map(|v| v * MIB);
    Some(NvidiaSmiRow {
        name: parts[0].to_string(),
        total_bytes: mib(parts[1])?,
        used_bytes: mib(parts[2])?,
        free_bytes: mib(parts[3])?,
        driver_version: parts
            .get(4)
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string()),
    })
}

/// Host RAM probe via `sysinfo`, used when no accelerator is present
/// (CPU inference shares system memory).
pub struct SystemMemoryProbe {
    sys: Mutex<System>,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            sys: Mutex::new(sys),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn snapshot(&self) -> MemorySnapshot {
        let mut sys = self.sys.lock();
        sys.refresh_memory();
        let total = sys.total_memory();
        // available_memory() is 0 on platforms that cannot report it
        let available = sys.available_memory();
        if available > 0 {
            MemorySnapshot {
                total_bytes: total,
                used_bytes: total.saturating_sub(available),
                free_bytes: available,
            }
        } else {
            MemorySnapshot::new(total, sys.used_memory())
        }
    }

    fn device(&self) -> DeviceInfo {
        DeviceInfo {
            available: false,
            device_name: "host memory".to_string(),
            backend: "cpu".to_string(),
            driver_version: None,
            device_count: 0,
        }
    }
}

/// Pick the best hardware probe: NVIDIA when present, host RAM otherwise.
pub fn detect_probe() -> Arc<dyn MemoryProbe> {
    if NvidiaSmiProbe::is_available() {
        debug!("using nvidia-smi memory probe");
        Arc::new(NvidiaSmiProbe::default())
    } else {
        debug!("no NVIDIA device found, using host memory probe");
        Arc::new(SystemMemoryProbe::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row() {
        let row = parse_nvidia_smi_row("NVIDIA GeForce GTX 1050 Ti, 4096, 1200, 2896, 535.104.05")
            .expect("row");
        assert_eq!(row.name, "NVIDIA GeForce GTX 1050 Ti");
        assert_eq!(row.total_bytes, 4096 * MIB);
        assert_eq!(row.used_bytes, 1200 * MIB);
        assert_eq!(row.free_bytes, 2896 * MIB);
        assert_eq!(row.driver_version.as_deref(), Some("535.104.05"));
    }

    #[test]
    fn test_parse_row_without_driver() {
        let row = parse_nvidia_smi_row("Tesla T4, 15360, 0, 15360").expect("row");
        assert!(row.driver_version.is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_nvidia_smi_row("").is_none());
        assert!(parse_nvidia_smi_row("GPU, N/A, N/A, N/A").is_none());
    }

    #[test]
    fn test_system_probe_reports_ram() {
        let probe = SystemMemoryProbe::new();
        let snap = probe.snapshot();
        assert!(snap.total_bytes > 0);
        assert!(snap.used_bytes <= snap.total_bytes);
        assert!(!probe.device().available);
    }
}
