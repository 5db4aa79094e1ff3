//! Error taxonomy for adapters and the lifecycle coordinator.

use std::time::Duration;

use crate::types::ModelFamily;

/// Errors raised by a model adapter. These never cross the coordinator's
/// public boundary directly: the coordinator wraps them in a
/// [`CoordinatorError`] tagged with family and phase.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AdapterError {
    #[error("load failed: {0}")]
    Load(String),

    #[error("unload failed: {0}")]
    Unload(String),

    #[error("model is not loaded")]
    NotLoaded,

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("out of accelerator memory: requested {requested} bytes, {free} bytes free")]
    OutOfMemory { requested: u64, free: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for adapter results
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// Errors surfaced by [`ModelCoordinator`](crate::coordinator::ModelCoordinator)
/// and by [`AdapterHandle`](crate::coordinator::AdapterHandle).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoordinatorError {
    /// The adapter raised during `load()`. Not retried automatically.
    #[error("failed to load {family} model: {source}")]
    LoadFailed {
        family: ModelFamily,
        #[source]
        source: AdapterError,
    },

    /// The adapter raised during `unload()`. The slot moves to `Failed`
    /// because the stale family can no longer be trusted as resident.
    #[error("failed to unload {family} model: {source}")]
    UnloadFailed {
        family: ModelFamily,
        #[source]
        source: AdapterError,
    },

    /// The unload+load phase exceeded the configured deadline.
    #[error("switch to {family} model timed out after {}s", timeout.as_secs_f64())]
    SwitchTimeout {
        family: ModelFamily,
        timeout: Duration,
    },

    /// A handle was used after the slot moved on to another generation.
    #[error("{family} model is not resident; acquire it again")]
    NotResident { family: ModelFamily },

    /// `acquire` was called with a family that cannot occupy the slot.
    #[error("model family '{0}' cannot be loaded")]
    InvalidFamily(ModelFamily),

    /// Inference through a valid handle failed inside the adapter.
    #[error("{family} inference failed: {source}")]
    Inference {
        family: ModelFamily,
        #[source]
        source: AdapterError,
    },
}

impl CoordinatorError {
    /// The family the error refers to.
    pub fn family(&self) -> ModelFamily {
        match self {
            CoordinatorError::LoadFailed { family, .. }
            | CoordinatorError::UnloadFailed { family, .. }
            | CoordinatorError::SwitchTimeout { family, .. }
            | CoordinatorError::NotResident { family }
            | CoordinatorError::Inference { family, .. } => *family,
            CoordinatorError::InvalidFamily(family) => *family,
        }
    }

    /// `true` for errors a client should treat as "service unavailable,
    /// try again later" rather than as a bad request or a processing fault.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            CoordinatorError::LoadFailed { .. }
                | CoordinatorError::UnloadFailed { .. }
                | CoordinatorError::SwitchTimeout { .. }
                | CoordinatorError::NotResident { .. }
        )
    }
}

/// Convenience alias used throughout the coordinator
pub type Result<T> = std::result::Result<T, CoordinatorError>;
