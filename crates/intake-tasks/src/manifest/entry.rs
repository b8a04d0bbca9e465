//! Per-task manifest entries

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, trace, warn, Level};

/// Execution status of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    ValidationPassed,
    ValidationFailed,
    Aborted,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Terminal states that make the run unsuccessful
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::ValidationFailed | Self::Aborted)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::ValidationPassed => "VALIDATION_PASSED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collected resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub source: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
}

impl Resource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            checksum: None,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// Outcome record of a single task.
///
/// Status only moves forward: `PENDING -> RUNNING -> terminal`, or straight
/// from `PENDING` to `ABORTED`/`FAILED` when the task never got to run.
/// Transition methods return `false` and change nothing when the move is
/// not allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: String,
    status: TaskStatus,
    #[serde(default)]
    log: Vec<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    /// Artifact location relative to the work directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    /// Task-specific fields
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl TaskManifest {
    /// Fresh `PENDING` entry
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: task_type.into(),
            status: TaskStatus::Pending,
            log: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            relative_path: None,
            resources: Vec::new(),
            details: BTreeMap::new(),
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// `PENDING -> RUNNING`
    pub fn start(&mut self) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// Move into a terminal state, recording `completed_at` once
    pub fn finish(&mut self, status: TaskStatus) -> bool {
        let allowed = match (self.status, status) {
            (_, target) if !target.is_terminal() => false,
            (TaskStatus::Running, _) => true,
            (TaskStatus::Pending, TaskStatus::Aborted | TaskStatus::Failed) => true,
            _ => false,
        };
        if !allowed {
            debug!(task = %self.name, from = %self.status, to = %status, "ignored status transition");
            return false;
        }
        self.status = status;
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
        true
    }

    pub fn abort(&mut self) -> bool {
        self.finish(TaskStatus::Aborted)
    }

    /// Record `message` as the failure reason and end `FAILED`
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.log(Level::ERROR, message);
        self.finish(TaskStatus::Failed)
    }

    /// Append to the entry's log and emit the same line through tracing
    pub fn log(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        if level == Level::ERROR {
            error!(task = %self.name, "{message}");
        } else if level == Level::WARN {
            warn!(task = %self.name, "{message}");
        } else if level == Level::INFO {
            info!(task = %self.name, "{message}");
        } else if level == Level::DEBUG {
            debug!(task = %self.name, "{message}");
        } else {
            trace!(task = %self.name, "{message}");
        }
        self.log.push(message);
    }
}
