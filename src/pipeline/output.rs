//! Rendering and writing a finished delta.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::command::DeltaRoot;
use crate::config::OutputFormat;

/// Target for output - either stdout or a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) => Self::File(p),
            None => Self::Stdout,
        }
    }
}

/// Render `delta` in the requested format.
pub fn render_delta(delta: &DeltaRoot, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            if delta.is_empty() {
                Ok("-- no changes\n".to_string())
            } else {
                Ok(format!("-- {}\n{delta}", delta.summary()))
            }
        }
        OutputFormat::Json => delta.to_json_string().context("Failed to serialize delta"),
        OutputFormat::Prompts => {
            let mut out = String::new();
            for step in delta.proposed_steps() {
                let warning = if step.data_safe { "" } else { " (may lose data)" };
                let _ = writeln!(out, "[{:.2}] {}{warning}", step.confidence, step.prompt);
            }
            Ok(out)
        }
    }
}

/// Write output to the target (stdout or file)
pub fn write_output(content: &str, target: &OutputTarget, quiet: bool) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            print!("{content}");
            Ok(())
        }
        OutputTarget::File(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            if !quiet {
                tracing::info!("Delta written to {}", path.display());
            }
            Ok(())
        }
    }
}
