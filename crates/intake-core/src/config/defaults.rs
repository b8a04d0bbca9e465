//! Default configuration values

use super::types::Config;

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "intake.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "intake.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".intake.yaml";

/// File name of the local manifest copy inside the work directory
pub const LOCAL_MANIFEST_FILE: &str = "manifest.json";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ALT_CONFIG_FILE,
        ".intake.toml",
    ]
}

/// Generate default configuration YAML
pub fn default_config_yaml() -> String {
    let config = Config::default();
    serde_yaml::to_string(&config).unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# intake pipeline configuration

work_dir: output
log_level: info

manifest:
  url: gs://my-bucket/manifest.json
  conflict_policy: abandon

store:
  kind: local
  root: ./buckets

tasks:
  - name: list_inputs
    type: get_file_list
    source: my-bucket/inputs
    pattern: "*.csv"
    sentinel: input_files

  - name: fetch_inputs
    type: download
    source_key: input_files
"#;
