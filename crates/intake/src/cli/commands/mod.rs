//! CLI commands

mod completions;
mod init;
mod run;
mod tasks;
mod validate;

pub use completions::CompletionsCommand;
pub use init::InitCommand;
pub use run::RunCommand;
pub use tasks::TasksCommand;
pub use validate::ValidateCommand;
