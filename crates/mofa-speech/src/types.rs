//! Shared vocabulary for the speech runtime: model families, lifecycle
//! states, and the status snapshot handed to health/metrics readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two mutually exclusive model categories that compete for the
/// accelerator slot, plus `None` for "nothing committed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[default]
    None,
    /// Speech-to-text (ASR)
    Stt,
    /// Text-to-speech
    Tts,
}

impl ModelFamily {
    /// Families that can actually occupy the slot.
    pub const LOADABLE: [ModelFamily; 2] = [ModelFamily::Stt, ModelFamily::Tts];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::None => "none",
            ModelFamily::Stt => "stt",
            ModelFamily::Tts => "tts",
        }
    }

    /// `true` for `Stt` and `Tts`.
    pub fn is_loadable(&self) -> bool {
        !matches!(self, ModelFamily::None)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(ModelFamily::None),
            "stt" | "asr" => Ok(ModelFamily::Stt),
            "tts" => Ok(ModelFamily::Tts),
            other => Err(format!("unknown model family '{other}' (expected none, stt or tts)")),
        }
    }
}

/// Lifecycle of the single accelerator slot.
///
/// ```text
/// Idle -> Loading -> Resident -> Unloading -> Idle
///            |                      |
///            v                      v
///          Failed  ---(retry)--> Loading
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Idle,
    Loading,
    Resident,
    Unloading,
    Failed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Loading => "loading",
            LifecycleState::Resident => "resident",
            LifecycleState::Unloading => "unloading",
            LifecycleState::Failed => "failed",
        }
    }

    /// A transition is in flight.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, LifecycleState::Loading | LifecycleState::Unloading)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of the coordinator state, safe to hand to any reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub family: ModelFamily,
    pub lifecycle: LifecycleState,
    /// Human-readable identifier of the resident (or loading) model
    pub model_label: Option<String>,
    pub last_transition: Option<DateTime<Utc>>,
    /// Bumped on every transition; handles from an older generation are stale
    pub generation: u64,
}

impl CoordinatorStatus {
    pub fn is_resident(&self, family: ModelFamily) -> bool {
        self.lifecycle == LifecycleState::Resident && self.family == family
    }
}
