//! Trait definitions for object comparison strategies.

use std::fmt;

use super::context::ComparisonContext;
use crate::model::{Schema, SchemaObject};

/// One factor of a similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComponent {
    /// Field or refdict name, or `name` for the object name itself.
    pub name: &'static str,
    /// Factor in [0, 1]; the score is the product of all factors.
    pub factor: f64,
}

/// Why two objects scored the way they did.
///
/// Useful when tuning weights or auditing why a rename was (or was not)
/// proposed.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonExplanation {
    pub score: f64,
    pub components: Vec<ScoreComponent>,
}

impl ComparisonExplanation {
    /// Components that pulled the score below 1.0.
    pub fn penalties(&self) -> impl Iterator<Item = &ScoreComponent> {
        self.components.iter().filter(|c| c.factor < 1.0)
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let penalties: Vec<String> = self
            .penalties()
            .map(|c| format!("{} {:.3}", c.name, c.factor))
            .collect();
        if penalties.is_empty() {
            format!("{:.3}", self.score)
        } else {
            format!("{:.3} ({})", self.score, penalties.join(", "))
        }
    }
}

impl fmt::Display for ComparisonExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Scores how likely two objects of the same kind are the same logical
/// object across snapshots.
///
/// Implementations must return a value in `[0.0, 1.0]`: 1.0 means no
/// observable difference, 0.0 means the pair can never be an alter.
///
/// # Example
///
/// ```ignore
/// use schema_delta::matching::{ComparisonContext, FieldComparator, ObjectComparator};
///
/// let mut ctx = ComparisonContext::new();
/// let score = FieldComparator::new().compare(old_obj, new_obj, &old, &new, &mut ctx);
/// ```
pub trait ObjectComparator: Send + Sync {
    fn compare(
        &self,
        old: &SchemaObject,
        new: &SchemaObject,
        old_schema: &Schema,
        new_schema: &Schema,
        ctx: &mut ComparisonContext,
    ) -> f64;

    /// Name of this comparator, for logging.
    fn name(&self) -> &'static str;
}

impl<C: ObjectComparator + ?Sized> ObjectComparator for Box<C> {
    fn compare(
        &self,
        old: &SchemaObject,
        new: &SchemaObject,
        old_schema: &Schema,
        new_schema: &Schema,
        ctx: &mut ComparisonContext,
    ) -> f64 {
        (**self).compare(old, new, old_schema, new_schema, ctx)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_penalties_only() {
        let explanation = ComparisonExplanation {
            score: 0.5,
            components: vec![
                ScoreComponent { name: "name", factor: 1.0 },
                ScoreComponent { name: "target", factor: 0.5 },
            ],
        };
        assert_eq!(explanation.summary(), "0.500 (target 0.500)");
        assert_eq!(explanation.penalties().count(), 1);
    }
}
