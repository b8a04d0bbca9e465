//! Intake - declarative data-collection pipeline runner

mod cli;
mod exit_codes;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let settings = cli.log_settings();
    let guard = init_tracing(&settings);

    let code = cli.execute();

    drop(guard);
    std::process::exit(code);
}

/// Where and how loudly to log
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Console level used when RUST_LOG is unset
    pub console_level: String,
    /// Preferred directory for the JSON log file
    pub log_dir: Option<PathBuf>,
}

/// Set up tracing with two layers:
/// - Console: controlled by RUST_LOG (default: the configured log level)
/// - File: always debug-level JSON to `<work_dir>/logs`, or ~/.intake/logs
fn init_tracing(settings: &LogSettings) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.console_level));

    if let Some(log_dir) = log_directory(settings.log_dir.as_deref()) {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "intake.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
            .init();

        return Some(guard);
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    None
}

/// Returns the log directory path, creating it if needed.
fn log_directory(preferred: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = preferred {
        if std::fs::create_dir_all(dir).is_ok() {
            return Some(dir.to_path_buf());
        }
    }
    let log_dir = dirs::home_dir()?.join(".intake").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}
