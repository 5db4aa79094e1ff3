//! Service configuration
//!
//! Layered the usual way: built-in defaults, then an optional file (format
//! detected from the extension, `${VAR}`/`$VAR` substituted), then
//! environment variables prefixed with `MOFA_SPEECH` using `__` for nesting,
//! e.g. `MOFA_SPEECH__COORDINATOR__SWITCH_TIMEOUT_SECS=45`.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorOptions;
use crate::monitor::MonitorSettings;
use crate::types::ModelFamily;

pub const ENV_PREFIX: &str = "MOFA_SPEECH";

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted transcription upload
    pub max_upload_bytes: u64,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 50 * MIB,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub switch_timeout_secs: f64,
    /// Family loaded at startup, `none` to start idle
    pub preload: ModelFamily,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            switch_timeout_secs: 30.0,
            preload: ModelFamily::None,
        }
    }
}

impl CoordinatorConfig {
    pub fn options(&self) -> CoordinatorOptions {
        let defaults = CoordinatorOptions::default();
        let timeout =
            Duration::try_from_secs_f64(self.switch_timeout_secs).unwrap_or(defaults.switch_timeout);
        defaults.with_switch_timeout(timeout)
    }
}

/// One servable model as exposed through the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Canonical id clients send in `model`
    pub id: String,
    pub name: String,
    /// Extra ids accepted as equivalent to `id`
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl ModelEntry {
    pub fn accepts(&self, model: &str) -> bool {
        self.id == model || self.aliases.iter().any(|a| a == model)
    }

    /// Canonical id followed by aliases
    pub fn accepted_ids(&self) -> Vec<&str> {
        std::iter::once(self.id.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub stt: ModelEntry,
    pub tts: ModelEntry,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            stt: ModelEntry {
                id: "qwen3-asr-0.6b".to_string(),
                name: "Qwen3-ASR-0.6B".to_string(),
                aliases: vec!["qwen3-asr".to_string()],
                description: "Qwen3 speech recognition model".to_string(),
            },
            tts: ModelEntry {
                id: "indextts-2".to_string(),
                name: "IndexTTS2".to_string(),
                aliases: vec!["indextts".to_string()],
                description: "IndexTTS2 with voice cloning and emotion control".to_string(),
            },
        }
    }
}

impl ModelsConfig {
    pub fn entry(&self, family: ModelFamily) -> Option<&ModelEntry> {
        match family {
            ModelFamily::Stt => Some(&self.stt),
            ModelFamily::Tts => Some(&self.tts),
            ModelFamily::None => None,
        }
    }
}

/// Which memory probe backs the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// NVIDIA when available, host memory otherwise
    #[default]
    Auto,
    Nvidia,
    System,
    /// The simulated accelerator shared with the simulated adapters
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub probe: ProbeKind,
    pub vram_threshold_percent: f64,
    pub leak_threshold_mb: u64,
    pub history_size: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let settings = MonitorSettings::default();
        Self {
            probe: ProbeKind::Auto,
            vram_threshold_percent: settings.vram_threshold_percent,
            leak_threshold_mb: settings.leak_threshold_bytes / MIB,
            history_size: settings.history_size,
        }
    }
}

impl MonitorConfig {
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            vram_threshold_percent: self.vram_threshold_percent,
            leak_threshold_bytes: self.leak_threshold_mb * MIB,
            history_size: self.history_size,
        }
    }
}

/// Parameters of the simulated inference backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    pub device_name: String,
    pub device_total_bytes: u64,
    pub stt_footprint_bytes: u64,
    pub tts_footprint_bytes: u64,
    pub stt_load_latency_ms: u64,
    pub tts_load_latency_ms: u64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            device_name: "simulated-4gb".to_string(),
            device_total_bytes: 4 * GIB,
            stt_footprint_bytes: 1536 * MIB,
            tts_footprint_bytes: 3 * GIB,
            stt_load_latency_ms: 500,
            tts_load_latency_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub server: ServerConfig,
    pub coordinator: CoordinatorConfig,
    pub models: ModelsConfig,
    pub monitor: MonitorConfig,
    pub simulated: SimulatedConfig,
}

impl SpeechConfig {
    /// Defaults, then `path` if given, then `MOFA_SPEECH__*` variables.
    pub fn load(path: Option<&str>) -> ConfigResult<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub fn load_with_prefix(path: Option<&str>, env_prefix: &str) -> ConfigResult<Self> {
        let mut builder = Cfg::builder();

        if let Some(path) = path {
            let format = detect_format(path)?;
            let content = std::fs::read_to_string(path)?;
            builder = builder.add_source(File::from_str(&substitute_env_vars(&content), format));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: SpeechConfig = builder
            .build()
            .and_then(Cfg::try_deserialize)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse `content` in the given format without touching the environment.
    pub fn from_str(content: &str, format: FileFormat) -> ConfigResult<Self> {
        let config: SpeechConfig = Cfg::builder()
            .add_source(File::from_str(&substitute_env_vars(content), format))
            .build()
            .and_then(Cfg::try_deserialize)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let timeout = self.coordinator.switch_timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "coordinator.switch_timeout_secs must be positive, got {timeout}"
            )));
        }
        if !(0.0..=100.0).contains(&self.monitor.vram_threshold_percent) {
            return Err(ConfigError::Invalid(format!(
                "monitor.vram_threshold_percent must be within 0-100, got {}",
                self.monitor.vram_threshold_percent
            )));
        }
        if self.models.stt.id.trim().is_empty() || self.models.tts.id.trim().is_empty() {
            return Err(ConfigError::Invalid("model ids must not be empty".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_upload_bytes must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Detect configuration format from file extension
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));
static BARE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid regex"));

/// Replace `${VAR}` and `$VAR` with environment values. Unset variables are
/// left as written.
pub fn substitute_env_vars(content: &str) -> String {
    let lookup = |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    };
    let braced = BRACED_VAR.replace_all(content, lookup);
    BARE_VAR.replace_all(&braced, lookup).into_owned()
}
