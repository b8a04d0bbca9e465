//! Validate command

use std::collections::HashSet;

use clap::Args;
use console::style;
use tracing::info;

use intake_core::config::{resolve_config, validate_config};
use intake_core::Config;
use intake_tasks::TaskRegistry;

use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Check the pipeline file and every task definition without running anything
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Strict mode - treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

impl ValidateCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(strict = self.strict, "executing validate command");
        let cwd = std::env::current_dir()?;

        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        let config = match resolve_config(cli.config.as_deref(), &cwd) {
            Ok((config, _)) => Some(config),
            Err(e) => {
                errors.push(format!("Configuration: {e}"));
                None
            }
        };

        if let Some(ref config) = config {
            if let Err(e) = validate_config(config) {
                errors.push(format!("Configuration validation: {e}"));
            }
            let registry = TaskRegistry::register_all()?;
            check_definitions(config, &registry, &mut errors, &mut warnings);
        }

        let failed = !errors.is_empty() || (self.strict && !warnings.is_empty());

        if cli.format == OutputFormat::Json {
            let result = serde_json::json!({
                "valid": !failed,
                "errors": errors,
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else if !cli.quiet {
            for error in &errors {
                println!("  {} {}", style("✗").red(), error);
            }
            for warning in &warnings {
                println!("  {} {}", style("!").yellow(), warning);
            }
            if failed {
                println!("{}", style("Validation failed").red().bold());
            } else {
                println!("{}", style("Validation passed").green().bold());
            }
        }

        Ok(if failed {
            exit_codes::CONFIG_ERROR
        } else {
            exit_codes::SUCCESS
        })
    }
}

/// Instantiate every enabled definition, collecting all problems instead of
/// stopping at the first one
fn check_definitions(
    config: &Config,
    registry: &TaskRegistry,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let mut names = HashSet::new();
    for definition in &config.tasks {
        if !definition.enabled {
            warnings.push(format!("Task '{}' is disabled", definition.name));
            continue;
        }
        if !names.insert(definition.name.as_str()) {
            errors.push(format!("Duplicate task name: {}", definition.name));
            continue;
        }
        if let Err(e) = registry.instantiate(definition) {
            errors.push(format!("Task '{}': {e}", definition.name));
        }
    }

    if config.enabled_tasks().next().is_none() {
        warnings.push("No enabled tasks".to_string());
    }
}
