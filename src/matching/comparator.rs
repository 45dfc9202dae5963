//! Descriptor-driven default comparator.
//!
//! The score is a product of factors, one for the name, one per field and
//! one per refdict. Each factor is 1.0 when the two sides agree and degrades
//! towards the field's `compcoef` when they do not, so a field with a high
//! coefficient barely matters and one with a low coefficient dominates.

use indexmap::IndexMap;
use std::collections::HashSet;

use super::context::ComparisonContext;
use super::string_similarity::{compute_token_similarity, local_name_similarity, normalize_expression};
use super::traits::{ComparisonExplanation, ObjectComparator, ScoreComponent};
use crate::compile::map_qualified_names;
use crate::model::{FieldSpec, FieldValue, Name, Schema, SchemaObject, NAME_COMPCOEF};

/// Factor used for a refdict entry that has no counterpart.
const MISSING_CHILD: f64 = 0.2;

/// Compares objects field by field using the kind descriptor table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldComparator;

impl FieldComparator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Score `old` against `new` and keep the individual factors.
    pub fn explain(
        &self,
        old: &SchemaObject,
        new: &SchemaObject,
        old_schema: &Schema,
        new_schema: &Schema,
        ctx: &mut ComparisonContext,
    ) -> ComparisonExplanation {
        let fresh = ctx.begin(old.id, new.id);
        let components = self.components(old, new, old_schema, new_schema, ctx);
        let score: f64 = components.iter().map(|c| c.factor).product();
        if fresh {
            ctx.finish(old.id, new.id, score);
        }
        ComparisonExplanation {
            score,
            components,
        }
    }

    fn components(
        &self,
        old: &SchemaObject,
        new: &SchemaObject,
        old_schema: &Schema,
        new_schema: &Schema,
        ctx: &mut ComparisonContext,
    ) -> Vec<ScoreComponent> {
        if old.kind != new.kind {
            return vec![ScoreComponent {
                name: "kind",
                factor: 0.0,
            }];
        }
        let desc = old.kind.descriptor();
        let mut components = Vec::with_capacity(desc.fields.len() + desc.refdicts.len() + 1);
        components.push(ScoreComponent {
            name: "name",
            factor: name_factor(old, new, ctx),
        });

        for spec in desc.fields.iter().filter(|f| f.compcoef > 0.0) {
            let factor = self.field_factor(spec, old, new, old_schema, new_schema, ctx);
            components.push(ScoreComponent {
                name: spec.name,
                factor,
            });
            if spec.identity && factor < 1.0 {
                // A differing identity field rules the pair out entirely.
                components.push(ScoreComponent {
                    name: spec.name,
                    factor: 0.0,
                });
                return components;
            }
        }

        for refdict in desc.refdicts {
            let base = self.refdict_base(refdict.attr, old, new, old_schema, new_schema, ctx);
            components.push(ScoreComponent {
                name: refdict.attr,
                factor: base + (1.0 - base) * refdict.compcoef,
            });
        }
        components
    }

    fn field_factor(
        &self,
        spec: &FieldSpec,
        old: &SchemaObject,
        new: &SchemaObject,
        old_schema: &Schema,
        new_schema: &Schema,
        ctx: &mut ComparisonContext,
    ) -> f64 {
        let coef = spec.compcoef;
        let (left, right) = match (old.field(spec.name), new.field(spec.name)) {
            (None, None) => return 1.0,
            (Some(left), Some(right)) => (left, right),
            _ => return coef,
        };

        match (left, right) {
            (FieldValue::Expr(a), FieldValue::Expr(b)) => {
                let a = normalize_expression(&map_qualified_names(&a.text, |n| ctx.map_name(n)));
                let b = normalize_expression(&b.text);
                if a == b {
                    1.0
                } else {
                    coef + (1.0 - coef) * 0.5 * compute_token_similarity(&a, &b)
                }
            }
            (FieldValue::Ref(a), FieldValue::Ref(b)) => {
                let (Some(old_target), Some(new_target)) = (old_schema.get(*a), new_schema.get(*b)) else {
                    return coef;
                };
                if ctx.map_name(&old_target.name) == new_target.name {
                    return 1.0;
                }
                // Both targets are unmatched by name; they may be a rename of
                // each other, so let their own similarity decide.
                let vanished = new_schema.get_by_name(&ctx.map_name(&old_target.name)).is_none();
                let fresh = old_schema.get_by_name(&new_target.name).is_none();
                if vanished && fresh && old_target.kind == new_target.kind {
                    let s = self.compare(old_target, new_target, old_schema, new_schema, ctx);
                    coef + (1.0 - coef) * s
                } else {
                    coef
                }
            }
            (FieldValue::RefList(a), FieldValue::RefList(b)) => {
                let mapped: Option<Vec<Name>> = a
                    .iter()
                    .map(|id| old_schema.get(*id).map(|o| ctx.map_name(&o.name)))
                    .collect();
                let current: Option<Vec<Name>> =
                    b.iter().map(|id| new_schema.get(*id).map(|o| o.name.clone())).collect();
                match (mapped, current) {
                    (Some(x), Some(y)) if x == y => 1.0,
                    _ => coef,
                }
            }
            (FieldValue::RefSet(a), FieldValue::RefSet(b)) => {
                let mapped: Option<std::collections::BTreeSet<Name>> = a
                    .iter()
                    .map(|id| old_schema.get(*id).map(|o| ctx.map_name(&o.name)))
                    .collect();
                let current: Option<std::collections::BTreeSet<Name>> =
                    b.iter().map(|id| new_schema.get(*id).map(|o| o.name.clone())).collect();
                match (mapped, current) {
                    (Some(x), Some(y)) if x == y => 1.0,
                    _ => coef,
                }
            }
            (a, b) if a == b => 1.0,
            _ => coef,
        }
    }

    /// Mean child similarity within one refdict, keyed by local name.
    fn refdict_base(
        &self,
        attr: &str,
        old: &SchemaObject,
        new: &SchemaObject,
        old_schema: &Schema,
        new_schema: &Schema,
        ctx: &mut ComparisonContext,
    ) -> f64 {
        let old_children = old_schema.children_in(old.id, attr);
        let new_children: IndexMap<&str, &SchemaObject> = new_schema
            .children_in(new.id, attr)
            .into_iter()
            .map(|child| (child.name.local(), child))
            .collect();

        match (old_children.is_empty(), new_children.is_empty()) {
            (true, true) => return 1.0,
            (true, false) | (false, true) => return MISSING_CHILD,
            (false, false) => {}
        }

        let mut matched = HashSet::with_capacity(new_children.len());
        let mut total = 0.0;
        for child in &old_children {
            let mapped = ctx.map_name(&child.name);
            total += match new_children.get_full(mapped.local()) {
                Some((i, _, other)) if other.kind == child.kind => {
                    matched.insert(i);
                    self.compare(child, other, old_schema, new_schema, ctx)
                }
                _ => MISSING_CHILD,
            };
        }
        let added = new_children.len() - matched.len();
        total += added as f64 * MISSING_CHILD;
        total / (old_children.len() + added) as f64
    }
}

/// 1.0 when the old name is known to map onto the new one, either through a
/// recorded rename or because the two are same-named children of a pair
/// already being compared.
fn name_factor(old: &SchemaObject, new: &SchemaObject, ctx: &ComparisonContext) -> f64 {
    if ctx.map_name(&old.name) == new.name {
        return 1.0;
    }
    if let (Some(old_owner), Some(new_owner)) = (old.owner, new.owner) {
        if old.name.local() == new.name.local() && ctx.is_comparing(old_owner, new_owner) {
            return 1.0;
        }
    }
    NAME_COMPCOEF + (1.0 - NAME_COMPCOEF) * 0.5 * local_name_similarity(&old.name, &new.name)
}

impl ObjectComparator for FieldComparator {
    fn compare(
        &self,
        old: &SchemaObject,
        new: &SchemaObject,
        old_schema: &Schema,
        new_schema: &Schema,
        ctx: &mut ComparisonContext,
    ) -> f64 {
        if old.kind != new.kind {
            return 0.0;
        }
        if let Some(score) = ctx.memoized(old.id, new.id) {
            return score;
        }
        if !ctx.begin(old.id, new.id) {
            // Reference loop back to a pair under comparison: assume agreement
            // and let the outer comparison decide.
            return 1.0;
        }
        let score = self
            .components(old, new, old_schema, new_schema, ctx)
            .iter()
            .map(|c| c.factor)
            .product::<f64>()
            .clamp(0.0, 1.0);
        ctx.finish(old.id, new.id, score);
        score
    }

    fn name(&self) -> &'static str {
        "field"
    }
}
