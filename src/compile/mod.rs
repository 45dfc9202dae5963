//! Expression compiler capability.
//!
//! The engine never interprets expression text itself. It asks an
//! [`ExpressionCompiler`] for two things: the set of objects an expression
//! references (so dependencies can be tracked and ordered) and, when
//! renaming, where in the text each reference sits (so it can be rewritten).
//!
//! [`TextCompiler`] is the default implementation: it recognises qualified
//! names lexically. Callers with a real query compiler plug it in here.

mod resolve;
mod text;

pub use resolve::{resolve_fields, resolve_value};
pub use text::{map_qualified_names, TextCompiler};

use std::ops::Range;

use crate::error::Result;
use crate::model::{Name, ObjectId, Schema};

/// Context an expression is compiled in.
#[derive(Debug, Clone, Default)]
pub struct Anchors {
    /// The object the expression belongs to.
    pub subject: Option<ObjectId>,
    /// Module used to qualify bare names.
    pub module: Option<String>,
}

impl Anchors {
    #[must_use]
    pub fn for_object(subject: ObjectId, name: &Name) -> Self {
        Self {
            subject: Some(subject),
            module: name.module().map(str::to_string),
        }
    }
}

/// Result of compiling an expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledExpression {
    /// Type of the expression result, when it can be determined.
    pub resolved_type: Option<ObjectId>,
    /// Objects the expression depends on, deduplicated, in source order.
    pub references: Vec<ObjectId>,
}

/// A located reference inside expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpan {
    pub name: Name,
    /// Byte range of the reference in the source text.
    pub range: Range<usize>,
    /// False for `.child` shorthand, whose text is only the local name.
    pub qualified: bool,
}

/// Compiles expressions against a schema.
///
/// Implementations must be deterministic and side-effect free.
pub trait ExpressionCompiler: Send + Sync {
    /// Type-check `expr` and report what it references.
    fn compile(&self, expr: &str, schema: &Schema, anchors: &Anchors) -> Result<CompiledExpression>;

    /// Locate every reference in `expr`, including ones that do not resolve
    /// in `schema`.
    fn track_references(&self, expr: &str, schema: &Schema, anchors: &Anchors) -> Result<Vec<ReferenceSpan>>;
}

/// Rewrite references in `text`: every span whose name is `old` or derives
/// from `old` is replaced with the corresponding name under `new`.
///
/// Returns `None` when nothing matched.
#[must_use]
pub fn rewrite_references(text: &str, spans: &[ReferenceSpan], old: &Name, new: &Name) -> Option<String> {
    let mut edits: Vec<(&Range<usize>, Name)> = spans
        .iter()
        .filter_map(|span| {
            let renamed = if &span.name == old {
                new.clone()
            } else {
                span.name.rebase(old, new)?
            };
            let replacement = if span.qualified {
                renamed
            } else {
                Name::new(renamed.local())
            };
            Some((&span.range, replacement))
        })
        .collect();
    if edits.is_empty() {
        return None;
    }
    edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));

    let mut out = text.to_string();
    for (range, replacement) in edits {
        if range.end <= out.len() && out.is_char_boundary(range.start) && out.is_char_boundary(range.end) {
            out.replace_range(range.clone(), replacement.as_str());
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_exact_and_derived_references() {
        let text = "default::Foo.bar ++ default::Foo";
        let spans = vec![
            ReferenceSpan {
                name: Name::from("default::Foo.bar"),
                range: 0..16,
                qualified: true,
            },
            ReferenceSpan {
                name: Name::from("default::Foo"),
                range: 20..32,
                qualified: true,
            },
        ];
        let out = rewrite_references(
            text,
            &spans,
            &Name::from("default::Foo"),
            &Name::from("default::Qux"),
        );
        assert_eq!(out.as_deref(), Some("default::Qux.bar ++ default::Qux"));
    }

    #[test]
    fn test_rewrite_shorthand_keeps_local_form() {
        let spans = vec![ReferenceSpan {
            name: Name::from("default::Foo.bar"),
            range: 1..4,
            qualified: false,
        }];
        let out = rewrite_references(
            ".bar",
            &spans,
            &Name::from("default::Foo.bar"),
            &Name::from("default::Foo.baz"),
        );
        assert_eq!(out.as_deref(), Some(".baz"));
    }

    #[test]
    fn test_rewrite_without_matches() {
        let spans = vec![ReferenceSpan {
            name: Name::from("default::Other"),
            range: 0..14,
            qualified: true,
        }];
        assert_eq!(
            rewrite_references("default::Other", &spans, &Name::from("a::B"), &Name::from("a::C")),
            None
        );
    }
}
