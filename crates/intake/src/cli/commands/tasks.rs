//! Tasks command - list registered task types

use clap::Args;
use console::style;

use intake_tasks::TaskRegistry;

use crate::cli::{output, Cli, OutputFormat};
use crate::exit_codes;

/// List the task types a pipeline may use
#[derive(Debug, Args)]
pub struct TasksCommand {}

impl TasksCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        let registry = TaskRegistry::register_all()?;

        if cli.format == OutputFormat::Json {
            let types: Vec<_> = registry
                .registrations()
                .map(|r| {
                    serde_json::json!({
                        "type": r.type_name,
                        "phase": r.phase.to_string(),
                        "required_fields": r.required_fields,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&types)?);
            return Ok(exit_codes::SUCCESS);
        }

        println!("{}", output::header("Task types"));
        for registration in registry.registrations() {
            println!(
                "  {} {}",
                style(registration.type_name).bold(),
                style(format!("({})", registration.phase)).dim()
            );
            if !registration.required_fields.is_empty() {
                println!(
                    "{}",
                    output::key_value("requires", &registration.required_fields.join(", "))
                );
            }
        }
        Ok(exit_codes::SUCCESS)
    }
}
