//! Init command

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use intake_core::config::{DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_YAML};

use crate::cli::{output, Cli};
use crate::exit_codes;

/// Write a commented starter pipeline file
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(force = self.force, "executing init command");
        let config_path = match &self.output {
            Some(path) => path.clone(),
            None => std::env::current_dir()?.join(DEFAULT_CONFIG_YAML),
        };

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration file already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        if !cli.quiet {
            output::success(&format!(
                "Created {}",
                output::path_style().apply_to(config_path.display())
            ));
            output::info("Edit the task list, then check it with `intake validate`");
        }
        Ok(exit_codes::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn init(path: &std::path::Path, force: bool) -> anyhow::Result<i32> {
        let mut args = vec!["intake", "--quiet", "init", "--output", path.to_str().unwrap()];
        if force {
            args.push("--force");
        }
        let cli = Cli::try_parse_from(args).unwrap();
        let crate::cli::Commands::Init(cmd) = &cli.command else {
            unreachable!()
        };
        cmd.execute(&cli)
    }

    #[test]
    fn test_init_writes_template() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("intake.yaml");

        assert_eq!(init(&path, false).unwrap(), exit_codes::SUCCESS);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TEMPLATE);
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("intake.yaml");
        std::fs::write(&path, "tasks: []\n").unwrap();

        assert!(init(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "tasks: []\n");

        init(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TEMPLATE);
    }
}
