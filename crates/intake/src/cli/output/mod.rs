//! Output formatting utilities

use console::{style, Style};
use intake_tasks::TaskStatus;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Style for a terminal task status
pub fn status_style(status: TaskStatus) -> Style {
    match status {
        TaskStatus::Completed | TaskStatus::ValidationPassed => Style::new().green(),
        TaskStatus::Failed | TaskStatus::ValidationFailed => Style::new().red().bold(),
        TaskStatus::Aborted => Style::new().yellow(),
        TaskStatus::Pending | TaskStatus::Running => Style::new().dim(),
    }
}

/// Status marker used in task listings
pub fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed | TaskStatus::ValidationPassed => "✓",
        TaskStatus::Failed | TaskStatus::ValidationFailed => "✗",
        TaskStatus::Aborted => "■",
        TaskStatus::Pending | TaskStatus::Running => "·",
    }
}
