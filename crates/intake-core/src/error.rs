//! Error types for intake

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using IntakeError
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Main error type for intake operations
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// One or more required task fields are absent
    #[error("Invalid definition for task '{task}': missing fields: {}", fields.join(", "))]
    MissingFields { task: String, fields: Vec<String> },

    /// Two definitions share a name
    #[error("Duplicate task name: {0}")]
    DuplicateTaskName(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}
