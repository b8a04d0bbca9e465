//! Configuration validation

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::{Config, StoreKind};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_runtime(config)?;
    validate_manifest(config)?;
    validate_store(config)?;
    validate_tasks(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_runtime(config: &Config) -> Result<()> {
    if config.concurrency == 0 {
        return Err(ConfigError::InvalidValue {
            field: "concurrency".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_manifest(config: &Config) -> Result<()> {
    if let Some(url) = &config.manifest.url {
        if url.trim().is_empty() || url.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "manifest.url".to_string(),
                message: "must name an object, not a prefix".to_string(),
            }
            .into());
        }
    }

    if config.manifest.max_merge_attempts == 0 {
        return Err(ConfigError::InvalidValue {
            field: "manifest.max_merge_attempts".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_store(config: &Config) -> Result<()> {
    if config.store.kind == StoreKind::Local && config.store.root.is_none() {
        return Err(ConfigError::MissingField("store.root".to_string()).into());
    }

    Ok(())
}

fn validate_tasks(config: &Config) -> Result<()> {
    if !config.tasks.is_empty() {
        debug!(count = config.tasks.len(), "validating task definitions");
    }

    let mut seen = HashSet::new();
    for (i, task) in config.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks[{}].name", i),
                message: "task name cannot be empty".to_string(),
            }
            .into());
        }

        if task.task_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks[{}].type", i),
                message: "task type cannot be empty".to_string(),
            }
            .into());
        }

        if !seen.insert(task.name.as_str()) {
            return Err(ConfigError::DuplicateTaskName(task.name.clone()).into());
        }
    }

    Ok(())
}
