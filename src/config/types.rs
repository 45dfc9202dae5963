//! Configuration types for schema-delta runs.

use std::path::PathBuf;

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::diff::{DeltaConfig, MatchingStrategy, ObjectFilter};

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Top-level configuration, loadable from a config file and overridden by
/// CLI arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// Delta engine tuning (threshold, strategy, linearization)
    pub delta: DeltaConfig,
    /// Which modules and items are diffed
    pub filter: ObjectFilter,
    /// Output configuration (format, file)
    pub output: OutputConfig,
    /// Behavior flags
    pub behavior: BehaviorConfig,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub const fn alter_threshold(mut self, threshold: f64) -> Self {
        self.config.delta.alter_threshold = threshold;
        self
    }

    pub const fn strategy(mut self, strategy: MatchingStrategy) -> Self {
        self.config.delta.strategy = strategy;
        self
    }

    pub const fn linearize(mut self, enabled: bool) -> Self {
        self.config.delta.linearize = enabled;
        self
    }

    pub fn filter(mut self, filter: ObjectFilter) -> Self {
        self.config.filter = filter;
        self
    }

    pub const fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output.format = format;
        self
    }

    pub fn output_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.config.output.file = Some(file.into());
        self
    }

    pub const fn fail_on_change(mut self, enabled: bool) -> Self {
        self.config.behavior.fail_on_change = enabled;
        self
    }

    pub const fn min_confidence(mut self, confidence: f64) -> Self {
        self.config.behavior.min_confidence = Some(confidence);
        self
    }

    pub const fn verify(mut self, enabled: bool) -> Self {
        self.config.behavior.verify = enabled;
        self
    }

    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Output Configuration
// ============================================================================

/// How a computed delta is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented DDL-like dump
    #[default]
    Text,
    /// Serialized command tree
    Json,
    /// One migration question per proposed step
    Prompts,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Prompts => write!(f, "prompts"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Output file path (None for stdout)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// ============================================================================
// Behavior Configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Exit with code 1 if the delta is not empty
    pub fail_on_change: bool,
    /// Exit with code 2 if any proposed step is less certain than this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    /// Apply the delta to the old snapshot and check it reproduces the new one
    pub verify: bool,
}
