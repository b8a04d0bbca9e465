//! Error types for the task engine
//!
//! Task failures carry an explicit [`TaskErrorKind`]. The kind decides how far
//! a failure reaches: `Resource` errors stay with the task that raised them,
//! `Config` and `Infrastructure` errors additionally raise the run's abort
//! signal, and `Aborted` means the task stopped because that signal was set.

use intake_core::ConfigError;
use intake_stores::{DownloadError, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Classification of a task failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// Misconfiguration discovered while running (bad URL, bad parameter)
    Config,
    /// A single resource could not be read, fetched or decoded
    Resource,
    /// Something every later task depends on is unusable
    Infrastructure,
    /// The task observed the abort signal and stopped
    Aborted,
}

impl TaskErrorKind {
    /// Whether this kind escalates to the run-wide abort signal
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Config | Self::Infrastructure)
    }
}

/// Error returned from a task body
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Config, message)
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Resource, message)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Infrastructure, message)
    }

    pub fn aborted() -> Self {
        Self::new(TaskErrorKind::Aborted, "aborted")
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == TaskErrorKind::Aborted
    }
}

impl From<StoreError> for TaskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidUrl(_) => Self::config(err.to_string()),
            _ => Self::resource(err.to_string()),
        }
    }
}

impl From<DownloadError> for TaskError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::Store(e) => e.into(),
            DownloadError::UnsupportedScheme(_) => Self::config(err.to_string()),
            _ => Self::resource(err.to_string()),
        }
    }
}

impl From<ScratchpadError> for TaskError {
    fn from(err: ScratchpadError) -> Self {
        Self::resource(err.to_string())
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        Self::resource(err.to_string())
    }
}

/// Scratchpad access errors
#[derive(Debug, Error)]
pub enum ScratchpadError {
    /// Nothing was stored under the key
    #[error("Scratchpad key not found: {0}")]
    MissingKey(String),

    /// The stored value does not have the requested shape
    #[error("Scratchpad value for '{key}' has unexpected shape: {reason}")]
    Decode { key: String, reason: String },

    /// The value could not be stored
    #[error("Cannot store scratchpad value for '{key}': {reason}")]
    Encode { key: String, reason: String },
}

/// Registry errors; all of them are startup or configuration failures
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A registration violates the registry contract
    #[error("Malformed task implementation '{type_name}': {reason}")]
    Malformed { type_name: String, reason: String },

    /// Two implementations claim the same type name
    #[error("Task type registered twice: {0}")]
    Duplicate(String),

    /// No implementation for the requested type
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    /// The definition does not satisfy the concrete task schema
    #[error(transparent)]
    InvalidDefinition(#[from] ConfigError),
}

/// Failures detected before any task runs; these produce no manifest
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Duplicate task name: {0}")]
    DuplicateTaskName(String),
}

/// Manifest persistence errors
#[derive(Debug, Error)]
pub enum PersistError {
    /// The remote manifest moved past the held generation
    #[error("Manifest generation mismatch: held {expected}, remote is at {actual}")]
    GenerationMismatch { expected: u64, actual: u64 },

    #[error(transparent)]
    Store(StoreError),

    #[error("Manifest serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PersistError {
    pub fn is_generation_mismatch(&self) -> bool {
        matches!(self, Self::GenerationMismatch { .. })
    }
}

impl From<StoreError> for PersistError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::GenerationMismatch {
                expected, actual, ..
            } => Self::GenerationMismatch { expected, actual },
            other => Self::Store(other),
        }
    }
}
