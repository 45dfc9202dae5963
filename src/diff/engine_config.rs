//! Configuration types for the delta engine.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_ALTER_THRESHOLD, DEFAULT_PARALLEL_THRESHOLD};

/// How survivors of the fingerprint pass are paired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchingStrategy {
    /// Best-first greedy claiming, ties broken by name.
    #[default]
    Greedy,
    /// Maximum total similarity assignment (Kuhn-Munkres).
    Optimal,
}

impl std::fmt::Display for MatchingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Greedy => f.write_str("greedy"),
            Self::Optimal => f.write_str("optimal"),
        }
    }
}

/// Tuning knobs for [`DeltaEngine`](super::DeltaEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeltaConfig {
    /// A pair becomes an alter only when its similarity is strictly above
    /// this value.
    pub alter_threshold: f64,
    pub strategy: MatchingStrategy,
    /// Object count above which fingerprints are computed in parallel.
    pub parallel_threshold: usize,
    /// Reorder the finished tree so it applies front to back.
    pub linearize: bool,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            alter_threshold: DEFAULT_ALTER_THRESHOLD,
            strategy: MatchingStrategy::Greedy,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            linearize: true,
        }
    }
}

impl DeltaConfig {
    /// Only near-identical pairs are treated as alters.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            alter_threshold: 0.8,
            ..Self::default()
        }
    }

    /// Loose pairs are still proposed as renames.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            alter_threshold: 0.4,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.alter_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: MatchingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Whether `similarity` clears the alter threshold. A perfect score means
    /// nothing changed, so it is never an alter.
    #[must_use]
    pub fn is_alter(&self, similarity: f64) -> bool {
        similarity > self.alter_threshold && similarity < 1.0
    }
}
