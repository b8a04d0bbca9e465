//! Shell completions generation command

use std::io;

use clap::{Args, CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};
use tracing::info;

use crate::cli::Cli;
use crate::exit_codes;

/// Generate shell completions
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,
}

/// Supported shell types
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

impl From<ShellType> for Shell {
    fn from(shell: ShellType) -> Self {
        match shell {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
            ShellType::PowerShell => Shell::PowerShell,
            ShellType::Elvish => Shell::Elvish,
        }
    }
}

impl CompletionsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(shell = ?self.shell, "executing completions command");
        let mut cmd = Cli::command();
        let shell: Shell = self.shell.into();

        match &self.output {
            Some(output_path) => {
                let mut file = std::fs::File::create(output_path)?;
                generate(shell, &mut cmd, "intake", &mut file);
                if !cli.quiet {
                    println!("Completions written to {}", output_path.display());
                }
            }
            None => generate(shell, &mut cmd, "intake", &mut io::stdout()),
        }

        Ok(exit_codes::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_shell_type_conversion() {
        assert!(matches!(Shell::from(ShellType::Bash), Shell::Bash));
        assert!(matches!(Shell::from(ShellType::PowerShell), Shell::PowerShell));
    }

    #[test]
    fn test_completions_written_to_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("intake.bash");
        let cli = Cli::try_parse_from([
            "intake",
            "--quiet",
            "completions",
            "bash",
            "--output",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let crate::cli::Commands::Completions(cmd) = &cli.command else {
            unreachable!()
        };
        assert_eq!(cmd.execute(&cli).unwrap(), exit_codes::SUCCESS);
        assert!(std::fs::read_to_string(&path).unwrap().contains("intake"));
    }
}
