//! Configuration validation.

use super::types::{AppConfig, BehaviorConfig, OutputConfig};
use crate::diff::{DeltaConfig, ObjectFilter};

// ============================================================================
// Configuration Error
// ============================================================================

/// A single invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Dotted path of the offending field
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

pub trait Validatable {
    /// Validate the configuration, returning every error found.
    fn validate(&self) -> Vec<ConfigError>;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.delta.validate());
        errors.extend(self.filter.validate());
        errors.extend(self.output.validate());
        errors.extend(self.behavior.validate());
        errors
    }
}

impl Validatable for DeltaConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        // 1.0 would make every alter impossible, since the test is strict.
        if !(0.0..1.0).contains(&self.alter_threshold) {
            errors.push(ConfigError::new(
                "delta.alter_threshold",
                format!("must be in [0.0, 1.0), got {}", self.alter_threshold),
            ));
        }
        errors
    }
}

impl Validatable for ObjectFilter {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (field, values) in [
            ("filter.include_modules", &self.include_modules),
            ("filter.exclude_modules", &self.exclude_modules),
            ("filter.include_items", &self.include_items),
            ("filter.exclude_items", &self.exclude_items),
        ] {
            if values.iter().any(|v| v.trim().is_empty()) {
                errors.push(ConfigError::new(field, "entries must not be empty"));
            }
        }

        for module in &self.include_modules {
            if self.exclude_modules.contains(module) {
                errors.push(ConfigError::new(
                    "filter.exclude_modules",
                    format!("module '{module}' is both included and excluded"),
                ));
            }
        }

        for item in self.include_items.iter().chain(&self.exclude_items) {
            if !item.trim().is_empty() && !item.contains("::") {
                errors.push(ConfigError::new(
                    "filter.include_items",
                    format!("'{item}' is not a qualified name (module::name)"),
                ));
            }
        }

        errors
    }
}

impl Validatable for OutputConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(file) = &self.file {
            if file.as_os_str().is_empty() {
                errors.push(ConfigError::new("output.file", "path must not be empty"));
            }
        }
        errors
    }
}

impl Validatable for BehaviorConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(confidence) = self.min_confidence {
            if !(0.0..=1.0).contains(&confidence) {
                errors.push(ConfigError::new(
                    "behavior.min_confidence",
                    format!("must be between 0.0 and 1.0, got {confidence}"),
                ));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPreset, OutputFormat};
    use std::path::PathBuf;

    #[test]
    fn test_default_and_presets_are_valid() {
        assert!(AppConfig::default().is_valid());
        for preset in ConfigPreset::all() {
            assert!(AppConfig::from_preset(*preset).is_valid(), "{preset}");
        }
    }

    #[test]
    fn test_threshold_bounds() {
        let config = AppConfig::builder().alter_threshold(1.0).build();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "delta.alter_threshold");

        assert!(!AppConfig::builder().alter_threshold(-0.1).build().is_valid());
        assert!(AppConfig::builder().alter_threshold(0.0).build().is_valid());
    }

    #[test]
    fn test_min_confidence_bounds() {
        assert!(!AppConfig::builder().min_confidence(1.5).build().is_valid());
        assert!(AppConfig::builder().min_confidence(1.0).build().is_valid());
    }

    #[test]
    fn test_filter_conflicts() {
        let filter = ObjectFilter::new().include_module("shop").exclude_module("shop");
        let errors = filter.validate();
        assert!(errors.iter().any(|e| e.message.contains("both included and excluded")));

        let filter = ObjectFilter::new().exclude_item("Legacy");
        assert_eq!(filter.validate()[0].field, "filter.include_items");
    }

    #[test]
    fn test_output_file_must_not_be_empty() {
        let config = OutputConfig {
            format: OutputFormat::Json,
            file: Some(PathBuf::new()),
        };
        assert_eq!(config.validate().len(), 1);
    }
}
