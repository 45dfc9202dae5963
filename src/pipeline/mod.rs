//! Pipeline orchestration for delta runs.
//!
//! Shared load → delta → verify → render steps used by the CLI handlers.

mod delta_stage;
mod output;
mod parse;

pub use delta_stage::{compute_delta, determine_exit_code, verify_delta};
pub use output::{render_delta, write_output, OutputTarget};
pub use parse::{load_context, load_snapshot};

/// Structured pipeline error types for better diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to read or build a snapshot, guidance or rename file
    #[error("Load failed for {path}: {source}")]
    LoadFailed {
        path: String,
        #[source]
        source: crate::error::DeltaError,
    },

    /// The delta did not reproduce the new snapshot
    #[error("Verification failed: {}", differences.join("; "))]
    VerifyFailed { differences: Vec<String> },
}

/// Exit codes for CI/CD integration
pub mod exit_codes {
    /// No changes, or success
    pub const SUCCESS: i32 = 0;
    /// Changes detected with `--fail-on-change`
    pub const CHANGES_DETECTED: i32 = 1;
    /// A proposed step is below the minimum confidence
    pub const LOW_CONFIDENCE: i32 = 2;
    /// An error occurred
    pub const ERROR: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_values() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::CHANGES_DETECTED, 1);
        assert_eq!(exit_codes::LOW_CONFIDENCE, 2);
        assert_eq!(exit_codes::ERROR, 3);
    }

    #[test]
    fn test_verify_error_lists_differences() {
        let err = PipelineError::VerifyFailed {
            differences: vec!["a is missing".into(), "unexpected b".into()],
        };
        assert_eq!(err.to_string(), "Verification failed: a is missing; unexpected b");
    }
}
