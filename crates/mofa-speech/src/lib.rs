//! # mofa-speech
//!
//! Exclusive accelerator-slot coordination for a speech service that serves
//! a speech-to-text and a text-to-speech model from one device too small to
//! hold both.
//!
//! The [`ModelCoordinator`] owns both adapters. Request handlers call
//! [`ModelCoordinator::acquire`] with the family they need and get back an
//! [`AdapterHandle`], or call [`ModelCoordinator::acquire_lease`] to keep
//! the family pinned while inference runs; the coordinator unloads the other family first when
//! required, bounds the switch with a deadline, and keeps a status snapshot
//! that health checks can read at any time.
//!
//! ## Modules
//!
//! | Module        | Contents                                            |
//! |---------------|-----------------------------------------------------|
//! | `types`       | `ModelFamily`, `LifecycleState`, `CoordinatorStatus` |
//! | `adapter`     | adapter traits, request/response types, simulated backend |
//! | `coordinator` | `ModelCoordinator`, `AdapterHandle`, `AdapterLease` |
//! | `monitor`     | memory probes, leak detection, switch statistics    |
//! | `config`      | layered `SpeechConfig`                              |
//! | `error`       | `AdapterError`, `CoordinatorError`                  |

pub mod adapter;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod monitor;
pub mod types;

pub use adapter::{Adapter, ModelAdapter, SpeechToText, TextToSpeech};
pub use config::{ConfigError, SpeechConfig};
pub use coordinator::{AdapterHandle, AdapterLease, CoordinatorOptions, ModelCoordinator};
pub use error::{AdapterError, AdapterResult, CoordinatorError, Result};
pub use monitor::{MemoryMonitor, MemoryProbe, MemorySnapshot};
pub use types::{CoordinatorStatus, LifecycleState, ModelFamily};
