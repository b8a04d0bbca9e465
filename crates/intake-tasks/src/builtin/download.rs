//! `download` task: fetch resources to the work directory

use std::collections::HashSet;
use std::path::PathBuf;

use intake_core::ConfigError;
use intake_stores::DownloadDescriptor;
use serde::Deserialize;
use tracing::Level;

use crate::error::TaskError;
use crate::manifest::{Resource, TaskManifest};
use crate::registry::RegisteredTask;
use crate::task::{Task, TaskContext, TaskOutcome, TaskPhase};

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadDefinition {
    pub name: String,
    /// Single URL to fetch
    pub source: Option<String>,
    /// Scratchpad key holding a list of URLs
    pub source_key: Option<String>,
    /// Directory under the work dir; defaults to the task name
    pub destination: Option<PathBuf>,
    /// Store prefix receiving a copy of every artifact
    pub upload_to: Option<String>,
}

/// Downloads one URL or a pretask-published URL list.
///
/// A failed fetch is logged and recorded as a resource without destination,
/// so the completeness check fails the task once every URL was tried.
#[derive(Debug)]
pub struct Download {
    definition: DownloadDefinition,
}

impl Download {
    fn sources(&self, ctx: &TaskContext) -> Result<Vec<String>, TaskError> {
        match (&self.definition.source, &self.definition.source_key) {
            (Some(url), _) => Ok(vec![url.clone()]),
            (None, Some(key)) => Ok(ctx.scratchpad.get(key)?),
            (None, None) => Err(TaskError::config("no source configured")),
        }
    }
}

/// Host or bucket plus object path of a URL, ignoring scheme, query and fragment
fn object_path(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let path = path.trim_end_matches('/');
    let (_, object) = path.split_once('/')?;
    if object.is_empty() || path.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return None;
    }
    Some(path)
}

/// Last path segment of a URL
fn object_name(url: &str) -> Option<&str> {
    object_path(url)?.rsplit('/').next()
}

/// Where `url` lands relative to the task directory: the bare file name,
/// or the full bucket/object path when another URL already took that name
fn local_name(url: &str, taken: &HashSet<String>) -> Option<String> {
    let name = object_name(url)?;
    if !taken.contains(name) {
        return Some(name.to_string());
    }
    let path = object_path(url)?;
    (!taken.contains(path)).then(|| path.to_string())
}

#[async_trait::async_trait]
impl Task for Download {
    fn name(&self) -> &str {
        &self.definition.name
    }

    async fn run(
        &self,
        ctx: &TaskContext,
        manifest: &mut TaskManifest,
    ) -> Result<TaskOutcome, TaskError> {
        let definition = &self.definition;
        let urls = self.sources(ctx)?;

        let relative = definition
            .destination
            .clone()
            .unwrap_or_else(|| PathBuf::from(&definition.name));
        let directory = ctx.work_dir.join(&relative);
        manifest.relative_path = Some(relative.display().to_string());

        let mut taken = HashSet::new();
        for url in urls {
            ctx.checkpoint()?;

            let Some(file_name) = local_name(&url, &taken) else {
                manifest.log(
                    Level::WARN,
                    format!("cannot derive a unique file name from {url}"),
                );
                manifest.resources.push(Resource::new(url));
                continue;
            };
            taken.insert(file_name.clone());

            let descriptor = DownloadDescriptor::new(url.clone(), directory.join(&file_name));
            match ctx.downloader.fetch(&descriptor).await {
                Ok(artifact) => {
                    manifest.log(
                        Level::INFO,
                        format!("downloaded {url} ({} bytes)", artifact.size),
                    );
                    if let Some(prefix) = &definition.upload_to {
                        ctx.checkpoint()?;
                        let target = format!("{}/{}", prefix.trim_end_matches('/'), file_name);
                        ctx.store.write(&artifact.path, &target).await?;
                        manifest.log(Level::INFO, format!("uploaded to {target}"));
                    }
                    manifest.resources.push(
                        Resource::new(url).with_destination(artifact.path.display().to_string()),
                    );
                }
                Err(e) => {
                    let err = TaskError::from(e);
                    if err.is_fatal() {
                        return Err(err);
                    }
                    manifest.log(Level::WARN, format!("failed to fetch {url}: {err}"));
                    manifest.resources.push(Resource::new(url));
                }
            }
        }

        Ok(TaskOutcome::Completed)
    }
}

impl RegisteredTask for Download {
    const TYPE_NAME: &'static str = "download";
    const PHASE: TaskPhase = TaskPhase::Task;

    type Definition = DownloadDefinition;

    fn from_definition(definition: Self::Definition) -> Result<Self, ConfigError> {
        let field = format!("tasks.{}.source", definition.name);
        match (&definition.source, &definition.source_key) {
            (None, None) => Err(ConfigError::InvalidValue {
                field,
                message: "one of source or source_key is required".to_string(),
            }),
            (Some(_), Some(_)) => Err(ConfigError::InvalidValue {
                field,
                message: "source and source_key are mutually exclusive".to_string(),
            }),
            _ => Ok(Self { definition }),
        }
    }
}
