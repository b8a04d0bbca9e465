//! Task execution reporting

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::manifest::{RunSummary, TaskStatus};
use crate::task::TaskPhase;

/// Events emitted during a run
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A phase is starting
    PhaseStarted { phase: TaskPhase, task_count: usize },
    /// A task moved to RUNNING
    Started { name: String, phase: TaskPhase },
    /// A task reached a terminal state after running
    Finished {
        name: String,
        status: TaskStatus,
        duration: Duration,
    },
    /// A task never ran
    Skipped { name: String, reason: String },
    /// Every task reached a terminal state
    RunFinished {
        summary: RunSummary,
        duration: Duration,
    },
}

/// Trait for reporting task execution progress
pub trait TaskReporter: Send + Sync {
    /// Handle a task event
    fn report(&self, event: &TaskEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::PhaseStarted { phase, task_count } => {
                tracing::info!(%phase, task_count, "phase started");
            }
            TaskEvent::Started { name, phase } => {
                tracing::info!(task = %name, %phase, "started");
            }
            TaskEvent::Finished {
                name,
                status,
                duration,
            } => {
                if status.is_failure() {
                    tracing::warn!(task = %name, %status, "finished in {:.1}s", duration.as_secs_f64());
                } else {
                    tracing::info!(task = %name, %status, "finished in {:.1}s", duration.as_secs_f64());
                }
            }
            TaskEvent::Skipped { name, reason } => {
                tracing::info!(task = %name, "skipped: {}", reason);
            }
            TaskEvent::RunFinished { summary, duration } => {
                tracing::info!(
                    total = summary.total(),
                    completed = summary.count(TaskStatus::Completed),
                    failed = summary.count(TaskStatus::Failed),
                    aborted = summary.count(TaskStatus::Aborted),
                    "run finished in {:.1}s",
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

/// Fans events out to several reporters
pub struct TaskReporterRegistry {
    reporters: Vec<Arc<dyn TaskReporter>>,
}

impl TaskReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register(&mut self, reporter: Arc<dyn TaskReporter>) {
        self.reporters.push(reporter);
    }

    pub fn all(&self) -> &[Arc<dyn TaskReporter>] {
        &self.reporters
    }
}

impl Default for TaskReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskReporter for TaskReporterRegistry {
    fn report(&self, event: &TaskEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}
