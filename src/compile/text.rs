//! Lexical expression compiler.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use super::{Anchors, CompiledExpression, ExpressionCompiler, ReferenceSpan};
use crate::error::{DeltaError, Result};
use crate::model::{Name, ObjectId, ObjectKind, Schema};

static QUALIFIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*::[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*")
        .expect("static regex")
});

static SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_:.\]\)])\.([A-Za-z_][A-Za-z0-9_]*)").expect("static regex")
});

static STRING_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*""#).expect("static regex")
});

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("static regex"));

/// Finds references by scanning for qualified names.
///
/// `module::Name` and `module::Name.child` paths resolve to the longest
/// prefix that names an existing object. `.child` shorthand resolves against
/// the anchor subject. Text inside string literals is ignored.
#[derive(Debug, Clone, Default)]
pub struct TextCompiler {
    strict: bool,
}

impl TextCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on qualified names that do not resolve instead of ignoring them.
    #[must_use]
    pub fn strict() -> Self {
        Self { strict: true }
    }

    fn scan(&self, expr: &str, schema: &Schema, anchors: &Anchors) -> Vec<Located> {
        let literals: Vec<Range<usize>> = STRING_LITERAL.find_iter(expr).map(|m| m.range()).collect();
        let in_literal = |pos: usize| literals.iter().any(|r| r.contains(&pos));

        let mut found: Vec<Located> = QUALIFIED
            .find_iter(expr)
            .filter(|m| !in_literal(m.start()))
            .map(|m| resolve_path(m.as_str(), m.start(), schema))
            .collect();

        let subject = anchors
            .subject
            .and_then(|id| schema.get(id))
            .map(|obj| obj.name.clone());
        if let Some(subject) = subject {
            for caps in SHORTHAND.captures_iter(expr) {
                let Some(local) = caps.get(1) else { continue };
                if in_literal(local.start()) {
                    continue;
                }
                let name = subject.child(local.as_str());
                let id = schema.get_by_name(&name).map(|o| o.id);
                found.push(Located {
                    span: ReferenceSpan {
                        name,
                        range: local.range(),
                        qualified: false,
                    },
                    id,
                });
            }
        }

        found.sort_by_key(|l| l.span.range.start);
        found
    }
}

struct Located {
    span: ReferenceSpan,
    id: Option<ObjectId>,
}

/// Resolve `path` to the longest existing prefix.
fn resolve_path(path: &str, start: usize, schema: &Schema) -> Located {
    let mut candidate = path;
    loop {
        if let Some(obj) = schema.get_by_name(&Name::from(candidate)) {
            return Located {
                span: ReferenceSpan {
                    name: obj.name.clone(),
                    range: start..start + candidate.len(),
                    qualified: true,
                },
                id: Some(obj.id),
            };
        }
        match candidate.rsplit_once('.') {
            Some((head, _)) => candidate = head,
            None => break,
        }
    }
    Located {
        span: ReferenceSpan {
            name: Name::from(path),
            range: start..start + path.len(),
            qualified: true,
        },
        id: None,
    }
}

fn literal_type(expr: &str, schema: &Schema) -> Option<ObjectId> {
    let trimmed = expr.trim();
    let type_name = if INTEGER.is_match(trimmed) {
        "std::int64"
    } else if trimmed == "true" || trimmed == "false" {
        "std::bool"
    } else if STRING_LITERAL
        .find(trimmed)
        .is_some_and(|m| m.start() == 0 && m.end() == trimmed.len())
    {
        "std::str"
    } else {
        return None;
    };
    schema.get_by_name(&Name::from(type_name)).map(|o| o.id)
}

impl ExpressionCompiler for TextCompiler {
    fn compile(&self, expr: &str, schema: &Schema, anchors: &Anchors) -> Result<CompiledExpression> {
        let located = self.scan(expr, schema, anchors);

        if self.strict {
            if let Some(unresolved) = located.iter().find(|l| l.id.is_none() && l.span.qualified) {
                return Err(DeltaError::compile(
                    expr,
                    format!("unknown name '{}'", unresolved.span.name),
                ));
            }
        }

        let mut references: Vec<ObjectId> = Vec::new();
        for id in located.iter().filter_map(|l| l.id) {
            if Some(id) != anchors.subject && !references.contains(&id) {
                references.push(id);
            }
        }

        let resolved_type = literal_type(expr, schema).or_else(|| {
            // A bare type name evaluates to that type.
            match located.as_slice() {
                [only] if only.span.range == (0..expr.len()) => only
                    .id
                    .filter(|id| {
                        schema.get(*id).is_some_and(|o| {
                            matches!(o.kind, ObjectKind::ScalarType | ObjectKind::ObjectType)
                        })
                    }),
                _ => None,
            }
        });

        Ok(CompiledExpression {
            resolved_type,
            references,
        })
    }

    fn track_references(&self, expr: &str, schema: &Schema, anchors: &Anchors) -> Result<Vec<ReferenceSpan>> {
        Ok(self
            .scan(expr, schema, anchors)
            .into_iter()
            .map(|l| l.span)
            .collect())
    }
}

/// Rewrite every qualified name in `text` through `map`, leaving string
/// literals alone.
///
/// Used to compare expressions across snapshots as if pending renames had
/// already been applied.
#[must_use]
pub fn map_qualified_names(text: &str, map: impl Fn(&Name) -> Name) -> String {
    let literals: Vec<Range<usize>> = STRING_LITERAL.find_iter(text).map(|m| m.range()).collect();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in QUALIFIED.find_iter(text) {
        if literals.iter().any(|r| r.contains(&m.start())) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(map(&Name::from(m.as_str())).as_str());
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}
