//! Diff command handler.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::AppConfig;
use crate::pipeline::{
    compute_delta, determine_exit_code, load_context, load_snapshot, render_delta, verify_delta,
    write_output, OutputTarget,
};

/// Input files for one `diff` run.
#[derive(Debug, Clone, Default)]
pub struct DiffPaths {
    pub old: PathBuf,
    pub new: PathBuf,
    pub guidance: Option<PathBuf>,
    pub renames: Option<PathBuf>,
}

/// Run the diff command, returning the desired exit code.
///
/// The caller is responsible for calling `std::process::exit()` with the
/// returned code when it is non-zero.
pub fn run_diff(config: &AppConfig, paths: &DiffPaths, quiet: bool) -> Result<i32> {
    let old = load_snapshot(&paths.old, quiet)?;
    let new = load_snapshot(&paths.new, quiet)?;
    let mut ctx = load_context(paths.guidance.as_deref(), paths.renames.as_deref())?;

    let delta = compute_delta(config, &old, &new, &mut ctx)?;
    if config.behavior.verify {
        verify_delta(&delta, &old, &new, &config.filter)?;
    }

    let exit_code = determine_exit_code(config, &delta);

    let rendered = render_delta(&delta, config.output.format)?;
    let target = OutputTarget::from_option(config.output.file.clone());
    write_output(&rendered, &target, quiet)?;

    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::model::{ObjectDocument, ObjectKind, SchemaDocument};
    use crate::pipeline::exit_codes;
    use tempfile::TempDir;

    fn write_snapshots(tmp: &TempDir, new_kind_name: &str) -> DiffPaths {
        let base = SchemaDocument::new().with_std().module("default");
        let new = base
            .clone()
            .object(ObjectDocument::new(ObjectKind::ScalarType, new_kind_name).base("std::str"));

        let old_path = tmp.path().join("old.json");
        let new_path = tmp.path().join("new.json");
        std::fs::write(&old_path, base.to_json_string().unwrap()).unwrap();
        std::fs::write(&new_path, new.to_json_string().unwrap()).unwrap();
        DiffPaths {
            old: old_path,
            new: new_path,
            ..DiffPaths::default()
        }
    }

    #[test]
    fn test_run_diff_writes_json_and_fails_on_change() {
        let tmp = TempDir::new().unwrap();
        let paths = write_snapshots(&tmp, "default::Label");
        let out = tmp.path().join("delta.json");
        let config = AppConfig::builder()
            .output_format(OutputFormat::Json)
            .output_file(&out)
            .fail_on_change(true)
            .verify(true)
            .build();

        let code = run_diff(&config, &paths, true).unwrap();
        assert_eq!(code, exit_codes::CHANGES_DETECTED);

        let delta = crate::command::DeltaRoot::from_json_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(delta.summary().creates, 1);
    }

    #[test]
    fn test_run_diff_identical_snapshots_succeeds() {
        let tmp = TempDir::new().unwrap();
        let mut paths = write_snapshots(&tmp, "default::Label");
        paths.old.clone_from(&paths.new);
        let config = AppConfig::builder()
            .output_file(tmp.path().join("delta.txt"))
            .fail_on_change(true)
            .build();

        assert_eq!(run_diff(&config, &paths, true).unwrap(), exit_codes::SUCCESS);
    }
}
