//! Intake Tasks - task orchestration engine and run manifest
//!
//! Definitions are turned into tasks by the static [`TaskRegistry`]. The
//! [`Engine`] runs every pretask to completion in declaration order, then the
//! regular tasks on a bounded pool, and folds each task's own
//! [`TaskManifest`] entry into a [`ManifestDocument`]. [`ManifestStore`]
//! persists that document with generation-checked writes.

pub mod abort;
pub mod builtin;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod reporter;
pub mod scratchpad;
pub mod task;

pub use abort::AbortSignal;
pub use engine::{Engine, EngineOptions, Plan};
pub use error::{EngineError, PersistError, RegistryError, ScratchpadError, TaskError, TaskErrorKind};
pub use manifest::{
    are_all_resources_complete, compute_checksums, save_with_policy, ManifestDocument,
    ManifestStore, Resource, RunSummary, TaskManifest, TaskStatus,
};
pub use registry::{registration, RegisteredTask, TaskBinding, TaskRegistration, TaskRegistry};
pub use reporter::{CollectingReporter, TaskEvent, TaskReporter, TaskReporterRegistry, TracingReporter};
pub use scratchpad::Scratchpad;
pub use task::{Task, TaskContext, TaskOutcome, TaskPhase};
