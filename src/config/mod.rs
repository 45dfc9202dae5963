//! Configuration for schema-delta runs.
//!
//! - Typed configuration sections with serde defaults
//! - Validation for every section
//! - Named presets
//! - YAML/JSON config file discovery
//!
//! # Configuration File
//!
//! Place a `.schema-delta.yaml` file in your project root or
//! `~/.config/schema-delta/`:
//!
//! ```yaml
//! delta:
//!   alter_threshold: 0.7
//!   strategy: optimal
//! filter:
//!   exclude_modules: [legacy]
//! behavior:
//!   fail_on_change: true
//! ```
//!
//! ```
//! use schema_delta::config::{AppConfig, ConfigPreset, Validatable};
//!
//! let config = AppConfig::from_preset(ConfigPreset::Strict);
//! assert!(config.is_valid());
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{
    ConfigPreset, CI_MIN_CONFIDENCE, DEFAULT_ALTER_THRESHOLD, DEFAULT_PARALLEL_THRESHOLD,
};
pub use file::{discover_config_file, generate_example_config, load_config_file, load_or_default, ConfigFileError};
pub use types::{AppConfig, AppConfigBuilder, BehaviorConfig, OutputConfig, OutputFormat};
pub use validation::{ConfigError, Validatable};

/// JSON Schema for the config file format, for editor validation and
/// completion.
pub fn generate_json_schema() -> Result<String, serde_json::Error> {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_names_sections() {
        let schema = generate_json_schema().unwrap();
        for section in ["delta", "filter", "output", "behavior", "alter_threshold"] {
            assert!(schema.contains(section), "missing {section}");
        }
    }
}
