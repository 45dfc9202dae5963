//! Loading snapshots and session files.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use super::PipelineError;
use crate::compile::TextCompiler;
use crate::context::{DiffContext, Guidance};
use crate::error::DeltaError;
use crate::model::{Name, ObjectKind, Schema, SchemaDocument};

/// Load a snapshot document (JSON or YAML) and build its schema.
///
/// Documents that do not declare the `std` module get the built-in
/// declarations prepended.
pub fn load_snapshot(path: &Path, quiet: bool) -> Result<Schema> {
    if !quiet {
        tracing::info!("Loading snapshot: {}", path.display());
    }

    let schema = SchemaDocument::load(path)
        .map(with_std_if_missing)
        .and_then(|doc| Schema::from_document(&doc, &TextCompiler::default()))
        .map_err(|source| PipelineError::LoadFailed {
            path: path.display().to_string(),
            source,
        })?;

    if !quiet {
        tracing::info!("Loaded {} objects", schema.iter().count());
    }
    Ok(schema)
}

fn with_std_if_missing(doc: SchemaDocument) -> SchemaDocument {
    let declares_std = doc
        .objects
        .iter()
        .any(|o| o.kind == ObjectKind::Module && o.name.as_str() == "std");
    if declares_std {
        doc
    } else {
        doc.with_std()
    }
}

/// Build the session context from optional guidance and rename files.
///
/// The rename file is a map of old qualified name to new qualified name.
pub fn load_context(guidance: Option<&Path>, renames: Option<&Path>) -> Result<DiffContext> {
    let mut ctx = DiffContext::new();

    if let Some(path) = guidance {
        let guidance: Guidance = read_structured(path)?;
        ctx = ctx.with_guidance(guidance);
    }

    if let Some(path) = renames {
        let renames: IndexMap<Name, Name> = read_structured(path)?;
        for (old, new) in renames {
            ctx.record_rename(old, new);
        }
    }

    Ok(ctx)
}

fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed: std::result::Result<T, DeltaError> = if is_json {
        serde_json::from_str(&content).map_err(Into::into)
    } else {
        serde_yaml::from_str(&content).map_err(Into::into)
    };

    parsed.map_err(|source| {
        PipelineError::LoadFailed {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectDocument;
    use tempfile::TempDir;

    #[test]
    fn test_load_context_reads_both_files() {
        let tmp = TempDir::new().unwrap();
        let renames = tmp.path().join("renames.json");
        std::fs::write(&renames, r#"{"default::Foo": "default::Bar"}"#).unwrap();

        let mut guidance = Guidance::new();
        guidance.ban_deletion(ObjectKind::ObjectType, "default::Legacy");
        let guidance_path = tmp.path().join("guidance.yaml");
        std::fs::write(&guidance_path, serde_yaml::to_string(&guidance).unwrap()).unwrap();

        let ctx = load_context(Some(&guidance_path), Some(&renames)).unwrap();
        assert_eq!(
            ctx.renamed_to(&Name::from("default::Foo")),
            Some(&Name::from("default::Bar"))
        );
        assert!(ctx
            .guidance
            .deletion_banned(ObjectKind::ObjectType, &Name::from("default::Legacy")));
    }

    #[test]
    fn test_snapshot_without_std_gets_builtins() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("snapshot.yaml");
        let doc = SchemaDocument::new()
            .module("default")
            .object(ObjectDocument::new(ObjectKind::ScalarType, "default::Sku").base("std::str"));
        std::fs::write(&path, serde_yaml::to_string(&doc).unwrap()).unwrap();

        let schema = load_snapshot(&path, true).unwrap();
        assert!(schema.get_by_name(&Name::from("std::str")).is_some());
        assert!(schema.get_by_name(&Name::from("default::Sku")).is_some());
    }

    #[test]
    fn test_missing_snapshot_names_path() {
        let err = load_snapshot(Path::new("/nonexistent/old.json"), true).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/old.json"));
    }
}
