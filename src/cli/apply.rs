//! Apply command handler.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::command::DeltaRoot;
use crate::compile::TextCompiler;
use crate::model::SchemaDocument;
use crate::pipeline::{exit_codes, load_snapshot, write_output, OutputTarget};

/// Apply a JSON delta to a snapshot and write the resulting document.
pub fn run_apply(snapshot: &Path, delta: &Path, output_file: Option<PathBuf>, quiet: bool) -> Result<i32> {
    let schema = load_snapshot(snapshot, quiet)?;
    let content = std::fs::read_to_string(delta)
        .with_context(|| format!("Failed to read delta {}", delta.display()))?;
    let delta = DeltaRoot::from_json_str(&content).context("Failed to parse delta")?;

    if !quiet {
        tracing::info!("Applying {}", delta.summary());
    }
    let applied = delta
        .apply(&schema, &TextCompiler::default())
        .context("Failed to apply delta")?;

    let document = SchemaDocument::from_schema(&applied)?.to_json_string()?;
    write_output(&document, &OutputTarget::from_option(output_file), quiet)?;
    Ok(exit_codes::SUCCESS)
}
