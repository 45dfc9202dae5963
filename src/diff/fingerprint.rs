//! Structural fingerprints for the unchanged-object fast path.

use rayon::prelude::*;
use xxhash_rust::xxh3::Xxh3;

use crate::error::Result;
use crate::model::{Schema, SchemaObject};

/// Hash of an object's kind, name, explicit fields and owned children.
///
/// Owned children contribute by local name, so a child keeps its
/// fingerprint when only its owner is renamed. Top-level objects hash their
/// full name.
pub fn object_fingerprint(schema: &Schema, obj: &SchemaObject) -> Result<u64> {
    let mut hasher = Xxh3::new();
    hasher.update(obj.kind.as_str().as_bytes());
    hasher.update(&[0]);
    let name = if obj.owner.is_some() {
        obj.name.local()
    } else {
        obj.name.as_str()
    };
    hasher.update(name.as_bytes());
    hasher.update(&[0]);

    for (field, value) in schema.reduced_fields(obj)? {
        hasher.update(field.as_bytes());
        hasher.update(&[0]);
        hasher.update(&serde_json::to_vec(&value)?);
    }

    let mut children = schema
        .children(obj.id)
        .into_iter()
        .map(|child| object_fingerprint(schema, child))
        .collect::<Result<Vec<u64>>>()?;
    children.sort_unstable();
    for child in children {
        hasher.update(&child.to_le_bytes());
    }

    Ok(hasher.digest())
}

/// Fingerprints for `objects`, in order. Runs on the rayon pool when there
/// are more than `parallel_threshold` objects.
pub fn fingerprints(schema: &Schema, objects: &[&SchemaObject], parallel_threshold: usize) -> Result<Vec<u64>> {
    if objects.len() > parallel_threshold {
        objects
            .par_iter()
            .map(|obj| object_fingerprint(schema, obj))
            .collect()
    } else {
        objects
            .iter()
            .map(|obj| object_fingerprint(schema, obj))
            .collect()
    }
}
