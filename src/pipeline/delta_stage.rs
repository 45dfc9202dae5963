//! Delta computation and verification.

use anyhow::{Context, Result};

use super::{exit_codes, PipelineError};
use crate::command::DeltaRoot;
use crate::compile::TextCompiler;
use crate::config::AppConfig;
use crate::context::DiffContext;
use crate::diff::{DeltaEngine, ObjectFilter};
use crate::model::{snapshot_differences, Schema};

/// Run the delta engine configured from `config`.
pub fn compute_delta(config: &AppConfig, old: &Schema, new: &Schema, ctx: &mut DiffContext) -> Result<DeltaRoot> {
    let engine = DeltaEngine::new()
        .with_config(config.delta.clone())
        .with_filter(config.filter.clone());

    tracing::debug!(
        "Computing delta: comparator={}, strategy={}, threshold={}",
        engine.comparator_name(),
        config.delta.strategy,
        config.delta.alter_threshold
    );

    engine
        .delta_schemas(old, new, ctx)
        .context("Failed to compute delta")
}

/// Apply `delta` to `old` and check the result matches `new` on every
/// object `filter` considers.
pub fn verify_delta(delta: &DeltaRoot, old: &Schema, new: &Schema, filter: &ObjectFilter) -> Result<()> {
    let applied = delta
        .apply(old, &TextCompiler::default())
        .context("Failed to apply delta to the old snapshot")?;

    let considered = |obj: &crate::model::SchemaObject| {
        filter.accepts_kind(obj.kind) && filter.accepts_name(obj.kind, &obj.name)
    };
    let differences = snapshot_differences(&applied, new, considered)?;
    if differences.is_empty() {
        tracing::info!("Verified: delta reproduces the new snapshot");
        Ok(())
    } else {
        Err(PipelineError::VerifyFailed { differences }.into())
    }
}

/// Exit code for a finished delta under the configured behavior flags.
#[must_use]
pub fn determine_exit_code(config: &AppConfig, delta: &DeltaRoot) -> i32 {
    if let (Some(required), Some(lowest)) = (config.behavior.min_confidence, delta.min_confidence()) {
        if lowest < required {
            return exit_codes::LOW_CONFIDENCE;
        }
    }
    if config.behavior.fail_on_change && !delta.is_empty() {
        return exit_codes::CHANGES_DETECTED;
    }
    exit_codes::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::model::ObjectKind;

    fn delta_with_confidence(confidence: f64) -> DeltaRoot {
        DeltaRoot::from_commands(vec![Command::rename(
            ObjectKind::ScalarType,
            "default::A",
            "default::B",
        )
        .with_confidence(confidence)])
    }

    #[test]
    fn test_exit_code_for_empty_delta() {
        let config = AppConfig::builder().fail_on_change(true).min_confidence(0.9).build();
        assert_eq!(determine_exit_code(&config, &DeltaRoot::new()), exit_codes::SUCCESS);
    }

    #[test]
    fn test_exit_code_fail_on_change() {
        let delta = delta_with_confidence(1.0);
        assert_eq!(determine_exit_code(&AppConfig::default(), &delta), exit_codes::SUCCESS);

        let config = AppConfig::builder().fail_on_change(true).build();
        assert_eq!(determine_exit_code(&config, &delta), exit_codes::CHANGES_DETECTED);
    }

    #[test]
    fn test_low_confidence_wins_over_change() {
        let config = AppConfig::builder().fail_on_change(true).min_confidence(0.9).build();
        let delta = delta_with_confidence(0.7);
        assert_eq!(determine_exit_code(&config, &delta), exit_codes::LOW_CONFIDENCE);
    }
}
