//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), tasks = config.tasks.len(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// The first directory containing one of the known file names wins.
/// Parents are walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load an explicit file, or discover one starting at `dir`
pub fn resolve_config(explicit: Option<&Path>, dir: &Path) -> Result<(Config, PathBuf)> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            Ok((load_config(path)?, path.to_path_buf()))
        }
        None => load_config_from_dir(dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntakeError;
    use tempfile::TempDir;

    const PIPELINE_YAML: &str = "\
work_dir: out
tasks:
  - name: list_inputs
    type: get_file_list
    source: bucket/x
    pattern: '*.csv'
    sentinel: files
  - name: fetch
    type: download
    source_key: files
";

    #[test]
    fn test_find_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("intake.yaml");
        std::fs::write(&config_path, PIPELINE_YAML).unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("intake.yaml");
        std::fs::write(&config_path, PIPELINE_YAML).unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("intake.yaml");
        std::fs::write(&config_path, PIPELINE_YAML).unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("out"));
        assert_eq!(config.tasks.len(), 2);
        assert_eq!(config.tasks[1].params["source_key"], "files");
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("intake.toml");
        std::fs::write(
            &config_path,
            "work_dir = \"out\"\n\n[[tasks]]\nname = \"fetch\"\ntype = \"download\"\nsource = \"gs://bucket/a.csv\"\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.tasks[0].name, "fetch");
        assert_eq!(config.tasks[0].params["source"], "gs://bucket/a.csv");
    }

    #[test]
    fn test_load_config_malformed_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("intake.yaml");
        std::fs::write(&config_path, "tasks: [unclosed").unwrap();

        let err = load_config(&config_path).unwrap_err();
        assert!(matches!(err, IntakeError::Config(ConfigError::YamlError(_))));
    }

    #[test]
    fn test_resolve_missing_explicit_path() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");

        let err = resolve_config(Some(&missing), temp.path()).unwrap_err();
        assert!(matches!(err, IntakeError::Config(ConfigError::NotFound(_))));
    }
}
