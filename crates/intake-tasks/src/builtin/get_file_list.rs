//! `get_file_list` pretask: list a store prefix into the scratchpad

use intake_core::ConfigError;
use serde::Deserialize;
use tracing::Level;

use crate::error::TaskError;
use crate::manifest::TaskManifest;
use crate::registry::RegisteredTask;
use crate::task::{Task, TaskContext, TaskOutcome, TaskPhase};

#[derive(Debug, Clone, Deserialize)]
pub struct GetFileListDefinition {
    pub name: String,
    /// Store prefix to list, e.g. `bucket/x` or `gs://bucket/x`
    pub source: String,
    /// Include filter; a leading `!` turns it into an exclude filter
    pub pattern: String,
    /// Scratchpad key receiving the URL list
    pub sentinel: String,
}

/// Lists the direct children of `source` matching `pattern`
#[derive(Debug)]
pub struct GetFileList {
    definition: GetFileListDefinition,
}

impl GetFileList {
    /// `(include, exclude)` filters for the store listing
    fn filters(&self) -> (Option<&str>, Option<&str>) {
        match self.definition.pattern.strip_prefix('!') {
            Some(excluded) => (None, Some(excluded)),
            None => (Some(self.definition.pattern.as_str()), None),
        }
    }
}

#[async_trait::async_trait]
impl Task for GetFileList {
    fn name(&self) -> &str {
        &self.definition.name
    }

    async fn run(
        &self,
        ctx: &TaskContext,
        manifest: &mut TaskManifest,
    ) -> Result<TaskOutcome, TaskError> {
        ctx.checkpoint()?;
        let definition = &self.definition;
        let (include, exclude) = self.filters();

        manifest.log(
            Level::INFO,
            format!("listing {} matching '{}'", definition.source, definition.pattern),
        );
        let files = ctx.store.list(&definition.source, include, exclude).await?;
        if files.is_empty() {
            return Err(TaskError::resource(format!(
                "no files found in {} matching '{}'",
                definition.source, definition.pattern
            )));
        }

        manifest.log(Level::INFO, format!("found {} files", files.len()));
        manifest
            .details
            .insert("files".to_string(), serde_json::json!(files));
        ctx.scratchpad.store(&definition.sentinel, &files)?;
        Ok(TaskOutcome::Completed)
    }
}

impl RegisteredTask for GetFileList {
    const TYPE_NAME: &'static str = "get_file_list";
    const PHASE: TaskPhase = TaskPhase::Pretask;
    const REQUIRED_FIELDS: &'static [&'static str] = &["source", "pattern", "sentinel"];

    type Definition = GetFileListDefinition;

    fn from_definition(definition: Self::Definition) -> Result<Self, ConfigError> {
        if definition.pattern.trim_start_matches('!').is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks.{}.pattern", definition.name),
                message: "pattern must not be empty".to_string(),
            });
        }
        if definition.sentinel.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks.{}.sentinel", definition.name),
                message: "sentinel must not be empty".to_string(),
            });
        }
        Ok(Self { definition })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskErrorKind;
    use intake_stores::{InMemoryStore, StoreDownloader};
    use std::sync::Arc;

    fn context() -> TaskContext {
        let store = Arc::new(InMemoryStore::new());
        store.insert("gs://bucket/x/a.csv", "a").unwrap();
        store.insert("gs://bucket/x/b.csv", "b").unwrap();
        store.insert("gs://bucket/x/readme.txt", "c").unwrap();
        let downloader = Arc::new(StoreDownloader::new(store.clone()));
        TaskContext::new(store, downloader, "output")
    }

    fn task(pattern: &str) -> GetFileList {
        GetFileList::from_definition(GetFileListDefinition {
            name: "list".to_string(),
            source: "bucket/x".to_string(),
            pattern: pattern.to_string(),
            sentinel: "files".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_publishes_matching_files() {
        let ctx = context();
        let mut manifest = TaskManifest::new("list", "get_file_list");

        let outcome = task("*.csv").run(&ctx, &mut manifest).await.unwrap();

        assert_eq!(outcome, TaskOutcome::Completed);
        let files: Vec<String> = ctx.scratchpad.get("files").unwrap();
        assert_eq!(files, vec!["gs://bucket/x/a.csv", "gs://bucket/x/b.csv"]);
        assert_eq!(manifest.details["files"][0], "gs://bucket/x/a.csv");
    }

    #[tokio::test]
    async fn test_bang_pattern_excludes() {
        let ctx = context();
        let mut manifest = TaskManifest::new("list", "get_file_list");

        task("!.csv").run(&ctx, &mut manifest).await.unwrap();

        let files: Vec<String> = ctx.scratchpad.get("files").unwrap();
        assert_eq!(files, vec!["gs://bucket/x/readme.txt"]);
    }

    #[tokio::test]
    async fn test_no_match_is_resource_error() {
        let ctx = context();
        let mut manifest = TaskManifest::new("list", "get_file_list");

        let err = task("*.parquet").run(&ctx, &mut manifest).await.unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::Resource);
        assert!(!ctx.scratchpad.contains("files"));
    }

    #[tokio::test]
    async fn test_invalid_source_is_config_error() {
        let ctx = context();
        let mut manifest = TaskManifest::new("list", "get_file_list");
        let task = GetFileList::from_definition(GetFileListDefinition {
            name: "list".to_string(),
            source: "NOT A BUCKET".to_string(),
            pattern: "*".to_string(),
            sentinel: "files".to_string(),
        })
        .unwrap();

        let err = task.run(&ctx, &mut manifest).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let result = GetFileList::from_definition(GetFileListDefinition {
            name: "list".to_string(),
            source: "bucket/x".to_string(),
            pattern: "!".to_string(),
            sentinel: "files".to_string(),
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
