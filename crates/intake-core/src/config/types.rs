//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration for an intake run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory where task artifacts, logs and the local manifest copy land
    pub work_dir: PathBuf,

    /// Default log level when RUST_LOG is unset
    pub log_level: String,

    /// Maximum number of regular tasks running at once
    pub concurrency: usize,

    /// Manifest persistence settings
    pub manifest: ManifestConfig,

    /// Remote store backing listings, downloads and the manifest
    pub store: StoreConfig,

    /// Ordered task definitions (pretasks and tasks together)
    pub tasks: Vec<TaskDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("output"),
            log_level: "info".to_string(),
            concurrency: default_concurrency(),
            manifest: ManifestConfig::default(),
            store: StoreConfig::default(),
            tasks: Vec::new(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Config {
    /// Definitions that take part in the run, in declaration order
    pub fn enabled_tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.iter().filter(|t| t.enabled)
    }

    /// Apply command-line/environment overrides on top of the file values
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(dir) = &overrides.work_dir {
            self.work_dir = dir.clone();
        }
        if let Some(url) = &overrides.manifest_url {
            self.manifest.url = Some(url.clone());
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
        self
    }
}

/// Values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub work_dir: Option<PathBuf>,
    pub manifest_url: Option<String>,
    pub concurrency: Option<usize>,
    pub log_level: Option<String>,
}

/// Manifest persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Store URL of the remote manifest; local copy only when unset
    pub url: Option<String>,

    /// What to do when the remote manifest moved under us
    pub conflict_policy: ConflictPolicy,

    /// Reload-and-merge attempts before giving up (merge policy only)
    pub max_merge_attempts: u32,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            url: None,
            conflict_policy: ConflictPolicy::Abandon,
            max_merge_attempts: 3,
        }
    }
}

/// Caller-side reaction to a manifest generation mismatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Surface the conflict and leave the remote manifest untouched
    #[default]
    Abandon,
    /// Reload the remote manifest, merge this run's entries in, retry
    Merge,
}

/// Remote store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store backend
    pub kind: StoreKind,

    /// Root directory for the local backend
    pub root: Option<PathBuf>,
}

/// Store backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Process-local store, discarded at exit
    #[default]
    Memory,
    /// Buckets mapped onto directories under `root`
    Local,
}

/// Definition of one task in the pipeline
///
/// Only the shared fields are known at parse time; everything else is kept
/// in `params` and checked against the concrete task schema when the task
/// is instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Unique name within the run
    pub name: String,

    /// Registry key of the implementation
    #[serde(rename = "type")]
    pub task_type: String,

    /// Disabled definitions are skipped entirely
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Type-specific parameters
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl TaskDefinition {
    /// Create a new task definition
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: task_type.into(),
            enabled: true,
            params: BTreeMap::new(),
        }
    }

    /// Add a type-specific parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set whether the definition takes part in the run
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether a type-specific parameter is present and not null
    pub fn has_param(&self, key: &str) -> bool {
        self.params.get(key).is_some_and(|v| !v.is_null())
    }

    /// The full definition as a JSON object, shared fields included
    pub fn to_value(&self) -> serde_json::Value {
        let mut map: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert("name".to_string(), self.name.clone().into());
        map.insert("type".to_string(), self.task_type.clone().into());
        map.insert("enabled".to_string(), self.enabled.into());
        serde_json::Value::Object(map)
    }
}
