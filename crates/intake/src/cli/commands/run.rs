//! Run command - execute the pipeline and persist its manifest

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::{info, warn};

use intake_core::config::{resolve_config, validate_config, LOCAL_MANIFEST_FILE};
use intake_core::{ConfigError, ConfigOverrides, StoreConfig, StoreKind, TaskDefinition};
use intake_stores::{HttpDownloader, InMemoryStore, LocalStore, RemoteStore, RoutingDownloader};
use intake_tasks::{
    save_with_policy, AbortSignal, Engine, EngineOptions, ManifestDocument, ManifestStore,
    TaskContext, TaskEvent, TaskPhase, TaskReporter, TaskReporterRegistry, TaskRegistry,
    TaskStatus,
};

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Run the pipeline
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Directory for downloaded artifacts, logs and the local manifest copy
    #[arg(long, env = "INTAKE_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Store URL of the remote manifest
    #[arg(long, env = "INTAKE_MANIFEST_URL")]
    pub manifest_url: Option<String>,

    /// Maximum concurrent tasks
    #[arg(long, env = "INTAKE_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Only run the named task definitions (can be repeated); pretasks always run
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}

impl RunCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<i32> {
        let cwd = std::env::current_dir()?;
        let (config, config_path) = resolve_config(cli.config.as_deref(), &cwd)?;
        info!(config = %config_path.display(), "loaded pipeline");

        let config = config.with_overrides(&ConfigOverrides {
            work_dir: self.work_dir.clone(),
            manifest_url: self.manifest_url.clone(),
            concurrency: self.concurrency,
            log_level: cli.log_level.clone(),
        });
        validate_config(&config)?;

        let registry = Arc::new(TaskRegistry::register_all()?);
        let definitions = select_definitions(&config.tasks, &self.only, &registry)?;

        let store = build_store(&config.store, &cwd)?;
        let downloader = Arc::new(RoutingDownloader::new(store.clone(), HttpDownloader::new()));
        let work_dir = absolute(&cwd, &config.work_dir);
        std::fs::create_dir_all(&work_dir)
            .with_context(|| format!("creating work dir {}", work_dir.display()))?;

        let abort = AbortSignal::new();
        let interrupted = Arc::new(AtomicBool::new(false));
        spawn_interrupt_handler(abort.clone(), interrupted.clone());

        let ctx = TaskContext::new(store.clone(), downloader, &work_dir).with_abort(abort);

        let mut reporters = TaskReporterRegistry::new();
        if !cli.quiet && cli.format == OutputFormat::Text {
            reporters.register(Arc::new(ConsoleReporter::new(cli.verbose)));
        }
        let engine = Engine::new(
            registry,
            EngineOptions {
                concurrency: config.concurrency,
            },
            Arc::new(reporters),
        );

        // Configuration problems surface before anything runs
        let plan = engine.prepare(&definitions)?;

        let mut manifest_store = config
            .manifest
            .url
            .as_ref()
            .map(|url| ManifestStore::new(store.clone(), url.as_str()));
        if let Some(manifest_store) = manifest_store.as_mut() {
            if manifest_store.load().await?.is_some() {
                info!(
                    url = manifest_store.url(),
                    generation = manifest_store.generation(),
                    "remote manifest exists"
                );
            }
        }

        if !cli.quiet && cli.format == OutputFormat::Text {
            output::info(&format!(
                "Running {} task{} from {}",
                plan.len(),
                if plan.len() == 1 { "" } else { "s" },
                output::path_style().apply_to(config_path.display())
            ));
            println!();
        }

        let mut document = engine.execute(plan, &ctx).await;

        let saved = match manifest_store.as_mut() {
            Some(manifest_store) => Some(
                save_with_policy(
                    manifest_store,
                    &mut document,
                    config.manifest.conflict_policy,
                    config.manifest.max_merge_attempts,
                )
                .await,
            ),
            None => None,
        };

        let local_manifest = work_dir.join(LOCAL_MANIFEST_FILE);
        document
            .write_to(&local_manifest)
            .with_context(|| format!("writing {}", local_manifest.display()))?;
        info!(path = %local_manifest.display(), "wrote local manifest");

        print_summary(cli, &document, &local_manifest)?;

        if let Some(result) = saved {
            let generation = result?;
            info!(generation, "remote manifest saved");
            if !cli.quiet && cli.format == OutputFormat::Text {
                output::success(&format!(
                    "Manifest saved to {} (generation {})",
                    config.manifest.url.as_deref().unwrap_or_default(),
                    generation
                ));
            }
        }

        if interrupted.load(Ordering::SeqCst) {
            warn!("run interrupted");
            if !cli.quiet && cli.format == OutputFormat::Text {
                output::warning("Run interrupted; unfinished tasks were aborted");
            }
            return Ok(exit_codes::CANCELLED);
        }
        if document.summary().has_failures() {
            return Ok(exit_codes::ERROR);
        }
        Ok(exit_codes::SUCCESS)
    }
}

/// Definitions taking part in this run.
///
/// With `only` empty every definition is kept. Otherwise the named
/// definitions plus every pretask are kept, in declaration order.
pub fn select_definitions(
    definitions: &[TaskDefinition],
    only: &[String],
    registry: &TaskRegistry,
) -> Result<Vec<TaskDefinition>, ConfigError> {
    if only.is_empty() {
        return Ok(definitions.to_vec());
    }

    let known: BTreeSet<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
    let unknown: Vec<&str> = only
        .iter()
        .map(String::as_str)
        .filter(|name| !known.contains(name))
        .collect();
    if !unknown.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "only".to_string(),
            message: format!("no task named {}", unknown.join(", ")),
        });
    }

    Ok(definitions
        .iter()
        .filter(|d| only.contains(&d.name) || registry.is_pretask(d))
        .cloned()
        .collect())
}

/// Store backend for the configured kind
pub fn build_store(config: &StoreConfig, base: &Path) -> Result<Arc<dyn RemoteStore>, ConfigError> {
    match config.kind {
        StoreKind::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreKind::Local => {
            let root = config
                .root
                .as_ref()
                .ok_or_else(|| ConfigError::MissingField("store.root".to_string()))?;
            Ok(Arc::new(LocalStore::new(absolute(base, root))))
        }
    }
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn spawn_interrupt_handler(abort: AbortSignal, interrupted: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, aborting run");
            interrupted.store(true, Ordering::SeqCst);
            abort.abort();
        }
    });
}

fn print_summary(cli: &Cli, document: &ManifestDocument, local_manifest: &Path) -> anyhow::Result<()> {
    let summary = document.summary();

    if cli.format == OutputFormat::Json {
        let report = serde_json::json!({
            "session": document.session.to_string(),
            "total": summary.total(),
            "counts": summary.counts.iter().map(|(status, count)| {
                (status.to_string(), serde_json::json!(count))
            }).collect::<serde_json::Map<_, _>>(),
            "tasks": document.entries().map(|entry| {
                serde_json::json!({
                    "name": entry.name,
                    "type": entry.task_type,
                    "status": entry.status().to_string(),
                    "resources": entry.resources.len(),
                })
            }).collect::<Vec<_>>(),
            "manifest": local_manifest.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    let failed: Vec<_> = document
        .entries()
        .filter(|entry| entry.status().is_failure())
        .collect();
    if !failed.is_empty() {
        println!();
        println!(
            "  {} {}/{} tasks did not succeed:",
            style("✗").red().bold(),
            failed.len(),
            summary.total()
        );
        for entry in failed {
            let reason = entry.log_lines().last().cloned().unwrap_or_default();
            println!(
                "    {} {} {}",
                output::status_style(entry.status()).apply_to(entry.status()),
                style(&entry.name).bold(),
                style(reason).dim()
            );
        }
    }

    println!();
    println!(
        "{}",
        output::key_value("Manifest", &local_manifest.display().to_string())
    );
    Ok(())
}

/// Console reporter with live output
struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TaskReporter for ConsoleReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::PhaseStarted { phase, task_count } => {
                if self.verbose || *phase == TaskPhase::Pretask {
                    println!(
                        "  {} {} phase ({} task{})",
                        style("─").dim(),
                        phase,
                        task_count,
                        if *task_count == 1 { "" } else { "s" }
                    );
                }
            }
            TaskEvent::Started { name, phase } => {
                println!(
                    "  {} {} {}",
                    style("▸").dim(),
                    style(name).bold(),
                    if self.verbose {
                        style(format!("({phase})")).dim().to_string()
                    } else {
                        String::new()
                    }
                );
            }
            TaskEvent::Finished {
                name,
                status,
                duration,
            } => {
                let status_style = output::status_style(*status);
                println!(
                    "  {} {} {} {}",
                    status_style.apply_to(output::status_marker(*status)),
                    status_style.apply_to(name),
                    style(status.to_string()).dim(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim()
                );
            }
            TaskEvent::Skipped { name, reason } => {
                println!(
                    "  {} {} {}",
                    style("○").yellow(),
                    style(name).yellow(),
                    style(format!("({reason})")).dim()
                );
            }
            TaskEvent::RunFinished { summary, duration } => {
                let succeeded = summary.count(TaskStatus::Completed)
                    + summary.count(TaskStatus::ValidationPassed);
                let failed = summary.count(TaskStatus::Failed)
                    + summary.count(TaskStatus::ValidationFailed);
                println!();
                println!(
                    "  {} {}/{} succeeded, {} failed, {} aborted ({:.1}s)",
                    if summary.has_failures() {
                        style("✗").red().bold()
                    } else {
                        style("✓").green().bold()
                    },
                    succeeded,
                    summary.total(),
                    failed,
                    summary.count(TaskStatus::Aborted),
                    duration.as_secs_f64()
                );
            }
        }
    }
}
