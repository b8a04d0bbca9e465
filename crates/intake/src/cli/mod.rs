//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use intake_core::config::resolve_config;

use crate::exit_codes;
use crate::LogSettings;
use commands::{CompletionsCommand, InitCommand, RunCommand, TasksCommand, ValidateCommand};

/// Intake - declarative data-collection pipeline runner
#[derive(Debug, Parser)]
#[command(name = "intake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Pipeline file (discovered from the working directory when omitted)
    #[arg(short, long, global = true, env = "INTAKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Console log level when RUST_LOG is unset
    #[arg(long, global = true, env = "INTAKE_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the pipeline
    Run(RunCommand),

    /// Check the pipeline file and every task definition without running
    Validate(ValidateCommand),

    /// List registered task types
    Tasks(TasksCommand),

    /// Write a starter pipeline file
    Init(InitCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub fn execute(self) -> i32 {
        match self.dispatch() {
            Ok(code) => code,
            Err(e) => {
                let code = exit_codes::for_error(&e);
                tracing::error!(error = %e, code, "command failed");
                output::error(&format!("{e:#}"));
                code
            }
        }
    }

    fn dispatch(&self) -> anyhow::Result<i32> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Run(ref cmd) => cmd.execute(self),
            Commands::Validate(ref cmd) => cmd.execute(self),
            Commands::Tasks(ref cmd) => cmd.execute(self),
            Commands::Init(ref cmd) => cmd.execute(self),
            Commands::Completions(ref cmd) => cmd.execute(self),
        }
    }

    /// Directory commands resolve relative paths against
    pub fn base_dir(&self) -> PathBuf {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match &self.directory {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd,
        }
    }

    /// Log level and log directory, worked out before tracing is up.
    ///
    /// Reads the pipeline file silently; any failure here surfaces again
    /// once the command itself loads the configuration.
    pub fn log_settings(&self) -> LogSettings {
        let base = self.base_dir();
        let config = resolve_config(self.config.as_deref(), &base)
            .ok()
            .map(|(config, _)| config);

        let work_dir = match &self.command {
            Commands::Run(cmd) if cmd.work_dir.is_some() => cmd.work_dir.clone(),
            _ => config.as_ref().map(|c| c.work_dir.clone()),
        };
        let log_dir = work_dir.map(|dir| absolute(&base, &dir).join("logs"));

        let console_level = if self.verbose {
            "debug".to_string()
        } else if self.quiet {
            "error".to_string()
        } else {
            self.log_level
                .clone()
                .or_else(|| config.map(|c| c.log_level))
                .unwrap_or_else(|| "warn".to_string())
        };

        LogSettings {
            console_level,
            log_dir,
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
