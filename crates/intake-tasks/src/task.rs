//! Task trait and run context

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use intake_stores::{Downloader, RemoteStore};
use serde::Serialize;

use crate::abort::AbortSignal;
use crate::error::TaskError;
use crate::manifest::TaskManifest;
use crate::scratchpad::Scratchpad;

/// Execution phase of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// Runs to completion, in declaration order, before any regular task
    Pretask,
    /// Regular task; may run concurrently with other regular tasks
    Task,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretask => write!(f, "pretask"),
            Self::Task => write!(f, "task"),
        }
    }
}

/// How a task body ended when it did not raise an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    ValidationPassed,
    ValidationFailed(String),
}

/// Everything a task may touch besides its own manifest entry.
///
/// One context is shared by all tasks of a run; clones share the scratchpad,
/// the abort signal and the collaborators.
#[derive(Clone)]
pub struct TaskContext {
    pub scratchpad: Arc<Scratchpad>,
    pub abort: AbortSignal,
    pub store: Arc<dyn RemoteStore>,
    pub downloader: Arc<dyn Downloader>,
    /// Root for local artifacts
    pub work_dir: PathBuf,
}

impl TaskContext {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        downloader: Arc<dyn Downloader>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scratchpad: Arc::new(Scratchpad::new()),
            abort: AbortSignal::new(),
            store,
            downloader,
            work_dir: work_dir.into(),
        }
    }

    /// Share an existing abort signal (e.g. one wired to Ctrl-C)
    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// Poll point for long-running tasks
    pub fn checkpoint(&self) -> Result<(), TaskError> {
        if self.abort.is_aborted() {
            Err(TaskError::aborted())
        } else {
            Ok(())
        }
    }
}

/// A runnable task bound to one definition.
///
/// `run` receives the task's own manifest entry and nothing else from the
/// manifest. The engine owns status transitions; the body only appends log
/// lines, resources and details.
#[async_trait::async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        ctx: &TaskContext,
        manifest: &mut TaskManifest,
    ) -> Result<TaskOutcome, TaskError>;
}
