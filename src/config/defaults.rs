//! Default values and named presets.

use super::types::{AppConfig, BehaviorConfig, OutputConfig, OutputFormat};
use crate::diff::{DeltaConfig, MatchingStrategy};

// ============================================================================
// Default Values
// ============================================================================

/// Similarity a pair must exceed to become an alter.
pub const DEFAULT_ALTER_THRESHOLD: f64 = 0.6;

/// Survivor count above which fingerprints are computed on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

/// Lowest step confidence the `ci` preset accepts.
pub const CI_MIN_CONFIDENCE: f64 = 0.9;

// ============================================================================
// Configuration Presets
// ============================================================================

/// Named configuration presets for common use cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Standard threshold, greedy matching
    Default,
    /// Only near-identical pairs become renames
    Strict,
    /// Loosely similar pairs are still proposed as renames
    Permissive,
    /// Machine-readable output, fails on change or low confidence
    Ci,
}

impl ConfigPreset {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Strict => "strict",
            Self::Permissive => "permissive",
            Self::Ci => "ci",
        }
    }

    /// Parse a preset from a string name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" | "balanced" => Some(Self::Default),
            "strict" | "exact" => Some(Self::Strict),
            "permissive" | "loose" => Some(Self::Permissive),
            "ci" | "ci-cd" | "pipeline" => Some(Self::Ci),
            _ => None,
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Default => "Balanced rename detection suitable for most migrations",
            Self::Strict => "Renames only for near-identical objects, optimal pairing",
            Self::Permissive => "Proposes renames for loosely similar objects",
            Self::Ci => "JSON output that fails on any change or uncertain step",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Default, Self::Strict, Self::Permissive, Self::Ci]
    }
}

impl std::fmt::Display for ConfigPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Preset Implementations
// ============================================================================

impl AppConfig {
    #[must_use]
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Default => Self::default(),
            ConfigPreset::Strict => Self::strict_preset(),
            ConfigPreset::Permissive => Self::permissive_preset(),
            ConfigPreset::Ci => Self::ci_preset(),
        }
    }

    fn strict_preset() -> Self {
        Self {
            delta: DeltaConfig::strict().with_strategy(MatchingStrategy::Optimal),
            ..Self::default()
        }
    }

    fn permissive_preset() -> Self {
        Self {
            delta: DeltaConfig::permissive(),
            ..Self::default()
        }
    }

    fn ci_preset() -> Self {
        Self {
            output: OutputConfig {
                format: OutputFormat::Json,
                file: None,
            },
            behavior: BehaviorConfig {
                fail_on_change: true,
                min_confidence: Some(CI_MIN_CONFIDENCE),
                verify: true,
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names_round_trip() {
        for preset in ConfigPreset::all() {
            assert_eq!(ConfigPreset::from_name(preset.name()), Some(*preset));
        }
        assert_eq!(ConfigPreset::from_name("LOOSE"), Some(ConfigPreset::Permissive));
        assert_eq!(ConfigPreset::from_name("unknown"), None);
    }

    #[test]
    fn test_presets_differ_from_default() {
        let strict = AppConfig::from_preset(ConfigPreset::Strict);
        assert!(strict.delta.alter_threshold > DEFAULT_ALTER_THRESHOLD);
        assert_eq!(strict.delta.strategy, MatchingStrategy::Optimal);

        let permissive = AppConfig::from_preset(ConfigPreset::Permissive);
        assert!(permissive.delta.alter_threshold < DEFAULT_ALTER_THRESHOLD);

        let ci = AppConfig::from_preset(ConfigPreset::Ci);
        assert_eq!(ci.output.format, OutputFormat::Json);
        assert!(ci.behavior.fail_on_change);
        assert_eq!(ci.behavior.min_confidence, Some(CI_MIN_CONFIDENCE));
    }
}
