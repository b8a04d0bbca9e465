//! Intake Core - shared foundations for the intake pipeline runner
//!
//! This crate provides the error types and the configuration model
//! (pipeline file discovery, parsing and validation) used by the task
//! engine and the CLI.

pub mod config;
pub mod error;

pub use config::{
    Config, ConfigOverrides, ConflictPolicy, ManifestConfig, StoreConfig, StoreKind,
    TaskDefinition,
};
pub use error::{ConfigError, IntakeError, Result};
