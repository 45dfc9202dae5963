//! Config file discovery and loading.
//!
//! YAML and JSON files are both accepted; the format is chosen by extension.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::AppConfig;

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Config file names searched in each directory, in order.
const CONFIG_FILE_NAMES: &[&str] = &[
    ".schema-delta.yaml",
    ".schema-delta.yml",
    ".schema-delta.json",
    "schema-delta.yaml",
];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory, then each of its ancestors
/// 3. User config directory (`~/.config/schema-delta/`)
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(path) = cwd.ancestors().find_map(find_config_in_dir) {
            return Some(path);
        }
    }

    dirs::config_dir().and_then(|dir| find_config_in_dir(&dir.join("schema-delta")))
}

fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

// ============================================================================
// Configuration File Loading
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load an `AppConfig` from a YAML or JSON file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Load config from the discovered file, or fall back to the default.
///
/// A file that fails to parse is reported with `warn!` and ignored.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// The default configuration as a commented YAML file.
#[must_use]
pub fn generate_example_config() -> String {
    format!(
        "# schema-delta configuration\n\
         # Place this file at .schema-delta.yaml in your project root or ~/.config/schema-delta/\n\n{}",
        serde_yaml::to_string(&AppConfig::default()).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::diff::MatchingStrategy;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".schema-delta.yaml");
        std::fs::write(&config_path, "delta:\n  strategy: optimal\n").unwrap();

        assert_eq!(find_config_in_dir(tmp.path()), Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_earlier_names() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("schema-delta.yaml"), "").unwrap();
        let hidden = tmp.path().join(".schema-delta.yml");
        std::fs::write(&hidden, "").unwrap();

        assert_eq!(find_config_in_dir(tmp.path()), Some(hidden));
    }

    #[test]
    fn test_find_config_in_dir_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_in_dir(tmp.path()), None);
    }

    #[test]
    fn test_load_yaml_config() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");
        let yaml = r"
delta:
  alter_threshold: 0.75
  strategy: optimal
filter:
  exclude_modules: [legacy]
behavior:
  fail_on_change: true
";
        std::fs::write(&config_path, yaml).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.delta.alter_threshold, 0.75);
        assert_eq!(config.delta.strategy, MatchingStrategy::Optimal);
        assert!(config.delta.linearize);
        assert_eq!(config.filter.exclude_modules, vec!["legacy".to_string()]);
        assert!(config.behavior.fail_on_change);
    }

    #[test]
    fn test_load_json_config() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".schema-delta.json");
        std::fs::write(&config_path, r#"{"output": {"format": "prompts"}}"#).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.output.format, OutputFormat::Prompts);
        assert_eq!(config.delta, crate::diff::DeltaConfig::default());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));
    }

    #[test]
    fn test_malformed_config_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("broken.yaml");
        std::fs::write(&config_path, "delta: [not, a, map]\n").unwrap();

        assert!(matches!(load_config_file(&config_path), Err(ConfigFileError::Yaml(_))));
    }

    #[test]
    fn test_load_or_default_with_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("custom.yaml");
        std::fs::write(&config_path, "behavior:\n  verify: true\n").unwrap();

        let (config, loaded_from) = load_or_default(Some(&config_path));
        assert!(config.behavior.verify);
        assert_eq!(loaded_from, Some(config_path));
    }

    #[test]
    fn test_generate_example_config_parses_back() {
        let example = generate_example_config();
        assert!(example.contains("alter_threshold"));
        let parsed: AppConfig = serde_yaml::from_str(&example).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}
