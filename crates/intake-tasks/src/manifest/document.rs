//! Run-level manifest document

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::{TaskManifest, TaskStatus};

/// All task entries of one run, keyed by task name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDocument {
    /// Distinguishes concurrent runs writing the same manifest
    pub session: Uuid,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    #[serde(default)]
    tasks: BTreeMap<String, TaskManifest>,
}

impl Default for ManifestDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestDocument {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session: Uuid::new_v4(),
            created: now,
            modified: now,
            tasks: BTreeMap::new(),
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Advance `modified` to now; never moves it backwards
    pub fn touch(&mut self) {
        self.modified = self.modified.max(Utc::now());
    }

    /// Add an entry, replacing any previous entry with the same name
    pub fn insert(&mut self, entry: TaskManifest) -> Option<TaskManifest> {
        self.tasks.insert(entry.name.clone(), entry)
    }

    pub fn get(&self, name: &str) -> Option<&TaskManifest> {
        self.tasks.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TaskManifest> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Entry counts per status
    pub fn summary(&self) -> RunSummary {
        let mut counts = BTreeMap::new();
        for entry in self.tasks.values() {
            *counts.entry(entry.status()).or_insert(0) += 1;
        }
        RunSummary { counts }
    }

    /// Fold a concurrently written remote document into this one.
    ///
    /// Entries of this run win; remote entries for tasks this run did not
    /// execute are kept. `created` becomes the earlier of the two and
    /// `modified` never decreases.
    pub fn merge_from(&mut self, remote: ManifestDocument) {
        for (name, entry) in remote.tasks {
            self.tasks.entry(name).or_insert(entry);
        }
        self.created = self.created.min(remote.created);
        self.modified = self.modified.max(remote.modified);
        self.touch();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Write the pretty JSON form to a local file
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)
    }
}

/// Per-status entry counts of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub counts: BTreeMap<TaskStatus, usize>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Whether any task ended FAILED, VALIDATION_FAILED or ABORTED
    pub fn has_failures(&self) -> bool {
        self.counts
            .iter()
            .any(|(status, count)| status.is_failure() && *count > 0)
    }
}
