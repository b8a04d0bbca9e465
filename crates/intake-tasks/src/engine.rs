//! Execution engine: pretasks, then tasks on a bounded worker pool
//!
//! Each worker owns exactly one task's manifest entry. Only the coordinating
//! future inserts entries into the [`ManifestDocument`], and only after the
//! entry reached a terminal state.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use intake_core::TaskDefinition;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, Level};

use crate::error::{EngineError, TaskError};
use crate::manifest::{
    are_all_resources_complete, compute_checksums, ManifestDocument, TaskManifest, TaskStatus,
};
use crate::registry::{TaskBinding, TaskRegistry};
use crate::reporter::{TaskEvent, TaskReporter};
use crate::task::{TaskContext, TaskOutcome, TaskPhase};

/// Options for the engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Maximum regular tasks running at once
    pub concurrency: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Instantiated tasks of a run, split by phase in declaration order
pub struct Plan {
    pretasks: Vec<TaskBinding>,
    tasks: Vec<TaskBinding>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.pretasks.len() + self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs one pipeline invocation
pub struct Engine {
    registry: Arc<TaskRegistry>,
    options: EngineOptions,
    reporter: Arc<dyn TaskReporter>,
}

impl Engine {
    pub fn new(
        registry: Arc<TaskRegistry>,
        options: EngineOptions,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        Self {
            registry,
            options,
            reporter,
        }
    }

    /// Instantiate every enabled definition.
    ///
    /// Any failure here is a configuration error: nothing runs and no
    /// manifest is produced.
    pub fn prepare(&self, definitions: &[TaskDefinition]) -> Result<Plan, EngineError> {
        let mut names = HashSet::new();
        let mut plan = Plan {
            pretasks: Vec::new(),
            tasks: Vec::new(),
        };

        for definition in definitions {
            if !definition.enabled {
                debug!(task = %definition.name, "disabled, skipping");
                continue;
            }
            if !names.insert(definition.name.as_str()) {
                error!(task = %definition.name, "duplicate task name");
                return Err(EngineError::DuplicateTaskName(definition.name.clone()));
            }
            let binding = self.registry.instantiate(definition)?;
            match binding.phase {
                TaskPhase::Pretask => plan.pretasks.push(binding),
                TaskPhase::Task => plan.tasks.push(binding),
            }
        }
        Ok(plan)
    }

    /// Prepare and execute `definitions`
    pub async fn run(
        &self,
        definitions: &[TaskDefinition],
        ctx: &TaskContext,
    ) -> Result<ManifestDocument, EngineError> {
        let plan = self.prepare(definitions)?;
        Ok(self.execute(plan, ctx).await)
    }

    /// Execute a prepared plan. Always yields a document, even when every
    /// task failed or was aborted.
    #[instrument(skip_all, fields(tasks = plan.len()))]
    pub async fn execute(&self, plan: Plan, ctx: &TaskContext) -> ManifestDocument {
        let start = Instant::now();
        let mut document = ManifestDocument::new();
        let Plan { pretasks, tasks } = plan;

        self.reporter.report(&TaskEvent::PhaseStarted {
            phase: TaskPhase::Pretask,
            task_count: pretasks.len(),
        });
        for binding in pretasks {
            let pending = binding.manifest.clone();
            let handle = self.spawn(binding, ctx, None);
            document.insert(self.collect(pending, handle).await);
        }

        self.reporter.report(&TaskEvent::PhaseStarted {
            phase: TaskPhase::Task,
            task_count: tasks.len(),
        });
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut handles = Vec::new();
        for binding in tasks {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) if !ctx.abort.is_aborted() => permit,
                _ => {
                    document.insert(skip_aborted(binding.manifest, &*self.reporter));
                    continue;
                }
            };
            let pending = binding.manifest.clone();
            handles.push((pending, self.spawn(binding, ctx, Some(permit))));
        }

        for (pending, handle) in handles {
            document.insert(self.collect(pending, handle).await);
        }

        document.touch();
        self.reporter.report(&TaskEvent::RunFinished {
            summary: document.summary(),
            duration: start.elapsed(),
        });
        info!(aborted = ctx.abort.is_aborted(), "run finished");
        document
    }

    fn spawn(
        &self,
        binding: TaskBinding,
        ctx: &TaskContext,
        permit: Option<OwnedSemaphorePermit>,
    ) -> JoinHandle<TaskManifest> {
        let ctx = ctx.clone();
        let reporter = self.reporter.clone();
        tokio::spawn(async move {
            let _permit = permit;
            execute_task(binding, &ctx, &*reporter).await
        })
    }

    /// Wait for a worker. Panics in a task body are caught inside the worker;
    /// a worker that still fails to hand its entry back (cancelled, or a panic
    /// outside the body) gets a copy of the pending entry failed instead.
    async fn collect(&self, pending: TaskManifest, handle: JoinHandle<TaskManifest>) -> TaskManifest {
        match handle.await {
            Ok(entry) => entry,
            Err(e) => {
                let mut entry = pending;
                entry.fail(format!("task panicked: {e}"));
                self.reporter.report(&TaskEvent::Finished {
                    name: entry.name.clone(),
                    status: entry.status(),
                    duration: std::time::Duration::ZERO,
                });
                entry
            }
        }
    }
}

fn skip_aborted(mut manifest: TaskManifest, reporter: &dyn TaskReporter) -> TaskManifest {
    manifest.abort();
    reporter.report(&TaskEvent::Skipped {
        name: manifest.name.clone(),
        reason: "run aborted".to_string(),
    });
    manifest
}

/// The per-task execution boundary: every outcome of the task body ends as
/// a terminal manifest status, never as an error to the coordinator
async fn execute_task(
    binding: TaskBinding,
    ctx: &TaskContext,
    reporter: &dyn TaskReporter,
) -> TaskManifest {
    let TaskBinding {
        task,
        mut manifest,
        phase,
    } = binding;

    if ctx.abort.is_aborted() {
        return skip_aborted(manifest, reporter);
    }

    let start = Instant::now();
    manifest.start();
    reporter.report(&TaskEvent::Started {
        name: manifest.name.clone(),
        phase,
    });

    let result = match AssertUnwindSafe(task.run(ctx, &mut manifest))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(task = task.name(), panic = %message, "task panicked");
            Err(TaskError::resource(format!("task panicked: {message}")))
        }
    };
    let fatal = matches!(&result, Err(e) if e.is_fatal());
    let status = settle(&mut manifest, result);
    manifest.finish(status);

    if fatal {
        error!(task = %manifest.name, "fatal task error, aborting run");
        ctx.abort.abort();
    }

    reporter.report(&TaskEvent::Finished {
        name: manifest.name.clone(),
        status: manifest.status(),
        duration: start.elapsed(),
    });
    manifest
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn settle(manifest: &mut TaskManifest, result: Result<TaskOutcome, TaskError>) -> TaskStatus {
    compute_checksums(&mut manifest.resources);

    match result {
        Ok(TaskOutcome::Completed) => {
            if !manifest.resources.is_empty() && !are_all_resources_complete(&manifest.resources) {
                manifest.log(Level::ERROR, "could not retrieve all resources");
                TaskStatus::Failed
            } else {
                TaskStatus::Completed
            }
        }
        Ok(TaskOutcome::ValidationPassed) => TaskStatus::ValidationPassed,
        Ok(TaskOutcome::ValidationFailed(reason)) => {
            manifest.log(Level::WARN, reason);
            TaskStatus::ValidationFailed
        }
        Err(e) if e.is_aborted() => {
            manifest.log(Level::WARN, "aborted");
            TaskStatus::Aborted
        }
        Err(e) => {
            manifest.log(Level::ERROR, e.to_string());
            TaskStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::manifest::Resource;
    use crate::registry::TaskRegistration;
    use crate::reporter::CollectingReporter;
    use crate::task::Task;
    use intake_stores::{InMemoryStore, StoreDownloader};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Test task driven by its definition's `behavior` parameter
    struct Scripted {
        name: String,
        behavior: String,
        delay_ms: u64,
        key: String,
        artifact: Option<String>,
    }

    fn param_str(definition: &TaskDefinition, key: &str, default: &str) -> String {
        definition
            .params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    }

    fn build_scripted(definition: &TaskDefinition) -> Result<Box<dyn Task>, RegistryError> {
        Ok(Box::new(Scripted {
            name: definition.name.clone(),
            behavior: param_str(definition, "behavior", "ok"),
            delay_ms: definition
                .params
                .get("delay_ms")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            key: param_str(definition, "key", "files"),
            artifact: definition
                .params
                .get("artifact")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }))
    }

    #[async_trait::async_trait]
    impl Task for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(
            &self,
            ctx: &TaskContext,
            manifest: &mut TaskManifest,
        ) -> Result<TaskOutcome, TaskError> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            match self.behavior.as_str() {
                "publish" => {
                    ctx.scratchpad.store(&self.key, &vec!["gs://bucket/x/a.csv"])?;
                    Ok(TaskOutcome::Completed)
                }
                "consume" => {
                    let files: Vec<String> = ctx.scratchpad.get(&self.key)?;
                    manifest.log(Level::INFO, format!("{} files", files.len()));
                    Ok(TaskOutcome::Completed)
                }
                "fail" => Err(TaskError::resource("resource went missing")),
                "fatal" => Err(TaskError::infrastructure("store client unavailable")),
                "validation_failed" => Ok(TaskOutcome::ValidationFailed("row count 0".to_string())),
                "resource" => {
                    let mut resource = Resource::new("gs://bucket/x/a.csv");
                    resource.destination = self.artifact.clone();
                    manifest.resources.push(resource);
                    Ok(TaskOutcome::Completed)
                }
                "wait_abort" => {
                    for _ in 0..2000 {
                        ctx.checkpoint()?;
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    Ok(TaskOutcome::Completed)
                }
                "panic" => panic!("scripted panic"),
                _ => Ok(TaskOutcome::Completed),
            }
        }
    }

    fn scripted_registry() -> Arc<TaskRegistry> {
        let seed: fn(&TaskDefinition) -> TaskManifest = |d| TaskManifest::new(&d.name, &d.task_type);
        let registry = TaskRegistry::from_registrations([
            TaskRegistration {
                type_name: "scripted_pretask",
                phase: TaskPhase::Pretask,
                required_fields: &[],
                build: build_scripted,
                seed_manifest: seed,
            },
            TaskRegistration {
                type_name: "scripted",
                phase: TaskPhase::Task,
                required_fields: &[],
                build: build_scripted,
                seed_manifest: seed,
            },
        ])
        .unwrap();
        Arc::new(registry)
    }

    fn task(name: &str, behavior: &str) -> TaskDefinition {
        TaskDefinition::new(name, "scripted").with_param("behavior", behavior)
    }

    fn pretask(name: &str, behavior: &str) -> TaskDefinition {
        TaskDefinition::new(name, "scripted_pretask").with_param("behavior", behavior)
    }

    fn context(store: Arc<InMemoryStore>, work_dir: &std::path::Path) -> TaskContext {
        let downloader = Arc::new(StoreDownloader::new(store.clone()));
        TaskContext::new(store, downloader, work_dir)
    }

    fn engine(
        registry: Arc<TaskRegistry>,
        concurrency: usize,
    ) -> (Engine, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::default());
        let engine = Engine::new(registry, EngineOptions { concurrency }, reporter.clone());
        (engine, reporter)
    }

    fn status(document: &ManifestDocument, name: &str) -> TaskStatus {
        document.get(name).unwrap().status()
    }

    #[test]
    fn test_engine_options_default() {
        assert!(EngineOptions::default().concurrency > 0);
    }

    #[tokio::test]
    async fn test_pretasks_finish_before_tasks_start() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, reporter) = engine(scripted_registry(), 4);

        let definitions = vec![
            task("consumer", "consume"),
            pretask("producer", "publish").with_param("delay_ms", 30),
            pretask("second", "ok"),
        ];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert_eq!(status(&document, "producer"), TaskStatus::Completed);
        assert_eq!(status(&document, "second"), TaskStatus::Completed);
        assert_eq!(status(&document, "consumer"), TaskStatus::Completed);

        let events = reporter.events();
        let last_pretask_finish = events
            .iter()
            .rposition(|e| matches!(e, TaskEvent::Finished { name, .. } if name != "consumer"))
            .unwrap();
        let first_task_start = events
            .iter()
            .position(|e| matches!(e, TaskEvent::Started { phase: TaskPhase::Task, .. }))
            .unwrap();
        assert!(last_pretask_finish < first_task_start);

        let producer_done = document.get("second").unwrap().completed_at().unwrap();
        let consumer_started = document.get("consumer").unwrap().started_at().unwrap();
        assert!(producer_done <= consumer_started);
    }

    #[tokio::test]
    async fn test_pretasks_run_in_declaration_order() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, reporter) = engine(scripted_registry(), 4);

        let definitions = vec![
            pretask("first", "ok").with_param("delay_ms", 20),
            pretask("second", "ok"),
        ];
        engine.run(&definitions, &ctx).await.unwrap();

        let started: Vec<String> = reporter
            .events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::Started { name, .. } => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![
            task("bad", "fail"),
            task("good", "ok").with_param("delay_ms", 10),
            task("validated", "validation_failed"),
        ];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert_eq!(status(&document, "bad"), TaskStatus::Failed);
        assert_eq!(status(&document, "good"), TaskStatus::Completed);
        assert_eq!(status(&document, "validated"), TaskStatus::ValidationFailed);
        assert!(!ctx.abort.is_aborted());
        assert_eq!(
            document.get("bad").unwrap().log_lines(),
            ["resource went missing"]
        );
    }

    #[tokio::test]
    async fn test_failed_pretask_does_not_stop_run() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![pretask("producer", "fail"), task("consumer", "consume")];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert_eq!(status(&document, "producer"), TaskStatus::Failed);
        assert_eq!(status(&document, "consumer"), TaskStatus::Failed);
        assert!(document.get("consumer").unwrap().log_lines()[0].contains("files"));
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_pending_tasks() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, reporter) = engine(scripted_registry(), 1);

        let definitions = vec![task("broken", "fatal"), task("a", "ok"), task("b", "ok")];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert!(ctx.abort.is_aborted());
        assert_eq!(status(&document, "broken"), TaskStatus::Failed);
        for name in ["a", "b"] {
            let entry = document.get(name).unwrap();
            assert_eq!(entry.status(), TaskStatus::Aborted);
            assert!(entry.started_at().is_none());
        }
        let started = reporter
            .events()
            .iter()
            .filter(|e| matches!(e, TaskEvent::Started { .. }))
            .count();
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn test_fatal_pretask_aborts_every_task() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![
            pretask("setup", "fatal"),
            pretask("later", "ok"),
            task("a", "ok"),
        ];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert_eq!(status(&document, "setup"), TaskStatus::Failed);
        assert_eq!(status(&document, "later"), TaskStatus::Aborted);
        assert_eq!(status(&document, "a"), TaskStatus::Aborted);
    }

    #[tokio::test]
    async fn test_running_task_observes_abort() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![
            task("long", "wait_abort"),
            task("broken", "fatal").with_param("delay_ms", 20),
        ];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert_eq!(status(&document, "broken"), TaskStatus::Failed);
        let long = document.get("long").unwrap();
        assert_eq!(long.status(), TaskStatus::Aborted);
        assert!(long.started_at().is_some());
        assert!(long.completed_at().is_some());
    }

    #[tokio::test]
    async fn test_abort_before_run_still_yields_document() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        ctx.abort.abort();
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![pretask("p", "ok"), task("a", "ok"), task("b", "ok")];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert_eq!(document.len(), 3);
        assert!(document.entries().all(|e| e.status() == TaskStatus::Aborted));
        assert_eq!(document.summary().count(TaskStatus::Aborted), 3);
    }

    #[tokio::test]
    async fn test_unknown_type_produces_no_manifest() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, reporter) = engine(scripted_registry(), 2);

        let definitions = vec![task("a", "ok"), TaskDefinition::new("b", "elasticsearch")];
        let err = engine.run(&definitions, &ctx).await.err().unwrap();

        assert!(matches!(
            err,
            EngineError::Registry(RegistryError::UnknownTaskType(ref t)) if t == "elasticsearch"
        ));
        assert!(reporter.events().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![task("a", "ok"), task("a", "fail")];
        let err = engine.run(&definitions, &ctx).await.err().unwrap();
        assert!(matches!(err, EngineError::DuplicateTaskName(ref n) if n == "a"));
    }

    #[tokio::test]
    async fn test_disabled_definitions_skipped() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![
            task("a", "ok"),
            task("off", "fail").with_enabled(false),
            TaskDefinition::new("unknown_but_off", "nope").with_enabled(false),
        ];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert_eq!(document.len(), 1);
        assert!(document.get("off").is_none());
    }

    #[tokio::test]
    async fn test_panicking_task_is_failed() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![task("boom", "panic"), task("fine", "ok")];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        let boom = document.get("boom").unwrap();
        assert_eq!(boom.status(), TaskStatus::Failed);
        assert!(boom.started_at().is_some());
        assert!(boom.completed_at().is_some());
        assert_eq!(boom.log_lines(), ["task panicked: scripted panic".to_string()]);
        assert_eq!(status(&document, "fine"), TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_incomplete_resources_fail_the_task() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("a.csv");
        std::fs::write(&artifact, "id\n").unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, _) = engine(scripted_registry(), 2);

        let definitions = vec![
            task("present", "resource").with_param("artifact", artifact.display().to_string()),
            task("absent", "resource").with_param(
                "artifact",
                temp.path().join("missing.csv").display().to_string(),
            ),
        ];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        let present = document.get("present").unwrap();
        assert_eq!(present.status(), TaskStatus::Completed);
        assert!(present.resources[0].checksum.is_some());

        let absent = document.get("absent").unwrap();
        assert_eq!(absent.status(), TaskStatus::Failed);
        assert!(absent.log_lines().iter().any(|l| l.contains("could not retrieve")));
    }

    #[tokio::test]
    async fn test_file_list_then_download_end_to_end() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(InMemoryStore::new());
        store.insert("gs://bucket/x/a.csv", "id\n1\n").unwrap();
        store.insert("gs://bucket/x/b.csv", "id\n2\n").unwrap();
        store.insert("gs://bucket/x/notes.txt", "skip").unwrap();
        store.insert("gs://bucket/x/deeper/c.csv", "skip").unwrap();
        let ctx = context(store, temp.path());

        let registry = Arc::new(TaskRegistry::register_all().unwrap());
        let (engine, _) = engine(registry, 2);
        let definitions = vec![
            TaskDefinition::new("list_inputs", "get_file_list")
                .with_param("source", "bucket/x")
                .with_param("pattern", "*.csv")
                .with_param("sentinel", "files"),
            TaskDefinition::new("fetch_inputs", "download").with_param("source_key", "files"),
        ];
        let document = engine.run(&definitions, &ctx).await.unwrap();

        assert_eq!(status(&document, "list_inputs"), TaskStatus::Completed);
        let files: Vec<String> = ctx.scratchpad.get("files").unwrap();
        assert_eq!(files, vec!["gs://bucket/x/a.csv", "gs://bucket/x/b.csv"]);

        let fetch = document.get("fetch_inputs").unwrap();
        assert_eq!(fetch.status(), TaskStatus::Completed);
        assert_eq!(fetch.resources.len(), 2);
        assert!(fetch
            .resources
            .iter()
            .all(|r| r.checksum.as_deref().is_some_and(|c| c.len() == 64)));
        assert!(temp.path().join("fetch_inputs").join("a.csv").is_file());
        assert!(!document.summary().has_failures());
    }

    #[tokio::test]
    async fn test_status_sequence_is_monotone() {
        let temp = TempDir::new().unwrap();
        let ctx = context(Arc::new(InMemoryStore::new()), temp.path());
        let (engine, reporter) = engine(scripted_registry(), 2);

        let definitions = vec![task("a", "ok"), task("b", "fail")];
        engine.run(&definitions, &ctx).await.unwrap();

        for name in ["a", "b"] {
            let lifecycle: Vec<&'static str> = reporter
                .events()
                .iter()
                .filter_map(|e| match e {
                    TaskEvent::Started { name: n, .. } if n == name => Some("started"),
                    TaskEvent::Finished { name: n, .. } if n == name => Some("finished"),
                    TaskEvent::Skipped { name: n, .. } if n == name => Some("skipped"),
                    _ => None,
                })
                .collect();
            assert_eq!(lifecycle, vec!["started", "finished"]);
        }
    }
}
