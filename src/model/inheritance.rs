//! Inheritance: ancestor linearization and field propagation.

use indexmap::IndexMap;
use std::collections::{BTreeMap, VecDeque};

use super::kind::ObjectKind;
use super::name::{Name, ObjectId};
use super::schema::Schema;
use super::value::FieldValue;
use crate::error::{DeltaError, Result, SchemaErrorKind};
use crate::ordering::topological::{self, SortNode, SortOptions};

/// C3 linearization of `id`'s bases, nearest ancestor first, `id` excluded.
///
/// A cyclic `bases` graph fails with [`DeltaError::Cycle`]; bases that cannot
/// be merged consistently fail with
/// [`SchemaErrorKind::InconsistentHierarchy`].
pub fn compute_ancestors(schema: &Schema, id: ObjectId) -> Result<Vec<ObjectId>> {
    let mut visiting = Vec::new();
    let mut mro = linearize(schema, id, &mut visiting)?;
    mro.remove(0);
    Ok(mro)
}

fn linearize(schema: &Schema, id: ObjectId, visiting: &mut Vec<ObjectId>) -> Result<Vec<ObjectId>> {
    let obj = schema.get(id).ok_or_else(|| {
        DeltaError::schema(
            "computing ancestors",
            SchemaErrorKind::UnresolvedName {
                name: id.to_string(),
            },
        )
    })?;
    if visiting.contains(&id) {
        return Err(DeltaError::cycle(obj.name.to_string()));
    }
    visiting.push(id);

    let bases = obj.bases().to_vec();
    let mut sequences: Vec<VecDeque<ObjectId>> = Vec::with_capacity(bases.len() + 1);
    for base in &bases {
        sequences.push(linearize(schema, *base, visiting)?.into());
    }
    sequences.push(bases.into());

    let mut result = vec![id];
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            break;
        }
        let candidate = sequences
            .iter()
            .filter_map(|s| s.front().copied())
            .find(|head| !sequences.iter().any(|s| s.iter().skip(1).any(|x| x == head)))
            .ok_or_else(|| {
                DeltaError::schema(
                    "computing ancestors",
                    SchemaErrorKind::InconsistentHierarchy {
                        name: obj.name.to_string(),
                    },
                )
            })?;
        result.push(candidate);
        for s in &mut sequences {
            if s.front() == Some(&candidate) {
                s.pop_front();
            }
        }
    }

    visiting.pop();
    Ok(result)
}

/// Effective field values of every object of `kind`, with inheritable fields
/// folded in from bases.
///
/// Explicit values always win; among bases, the one sorted first wins.
pub fn resolve_inherited_fields(
    schema: &Schema,
    kind: ObjectKind,
) -> Result<IndexMap<ObjectId, BTreeMap<String, FieldValue>>> {
    let inheritable: Vec<&'static str> = kind
        .descriptor()
        .fields
        .iter()
        .filter(|f| f.inheritable)
        .map(|f| f.name)
        .collect();

    let graph: IndexMap<Name, SortNode<Name, (ObjectId, BTreeMap<String, FieldValue>)>> = schema
        .get_objects(kind)
        .map(|obj| {
            let bases = obj
                .bases()
                .iter()
                .filter_map(|b| schema.get(*b))
                .map(|b| b.name.clone());
            (
                obj.name.clone(),
                SortNode::new((obj.id, obj.fields.clone())).with_merge(bases),
            )
        })
        .collect();

    let merged = topological::normalize(graph, SortOptions::allow_unresolved(), |item, pred| {
        for field in &inheritable {
            if !item.1.contains_key(*field) {
                if let Some(value) = pred.1.get(*field) {
                    item.1.insert((*field).to_string(), value.clone());
                }
            }
        }
    })?;

    Ok(merged.into_iter().map(|(_, (id, fields))| (id, fields)).collect())
}
