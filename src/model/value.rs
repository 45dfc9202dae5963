//! Field values.
//!
//! [`FieldValue`] is what a snapshot stores: references are ids, so they
//! survive renames. [`PropertyValue`] is the reduced, name-based form carried
//! by commands and documents; it is what gets fingerprinted and diffed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::descriptor::FieldType;
use super::name::{Name, ObjectId};

/// An expression together with the objects it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub text: String,
    /// Objects the compiled expression depends on.
    pub refs: Vec<ObjectId>,
}

impl Expression {
    pub fn new(text: impl Into<String>, refs: Vec<ObjectId>) -> Self {
        Self {
            text: text.into(),
            refs,
        }
    }
}

/// A stored field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Str(String),
    StrList(Vec<String>),
    Expr(Expression),
    Ref(ObjectId),
    RefList(Vec<ObjectId>),
    RefSet(BTreeSet<ObjectId>),
}

impl FieldValue {
    /// Every object id this value points at.
    pub fn references(&self) -> Box<dyn Iterator<Item = ObjectId> + '_> {
        match self {
            Self::Ref(id) => Box::new(std::iter::once(*id)),
            Self::RefList(ids) => Box::new(ids.iter().copied()),
            Self::RefSet(ids) => Box::new(ids.iter().copied()),
            Self::Expr(expr) => Box::new(expr.refs.iter().copied()),
            Self::Bool(_) | Self::Int(_) | Self::Str(_) | Self::StrList(_) => {
                Box::new(std::iter::empty())
            }
        }
    }

    #[must_use]
    pub fn references_id(&self, id: ObjectId) -> bool {
        self.references().any(|r| r == id)
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Bool(_) => FieldType::Bool,
            Self::Int(_) => FieldType::Int,
            Self::Str(_) => FieldType::Str,
            Self::StrList(_) => FieldType::StrList,
            Self::Expr(_) => FieldType::Expr,
            Self::Ref(_) => FieldType::Ref,
            Self::RefList(_) => FieldType::RefList,
            Self::RefSet(_) => FieldType::RefSet,
        }
    }
}

/// A name-based field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
    StrList(Vec<String>),
    Expr(String),
    Ref(Name),
    RefList(Vec<Name>),
    RefSet(BTreeSet<Name>),
    /// Object identity, only used by the `id` property of a create.
    Id(ObjectId),
}

impl PropertyValue {
    /// Whether this value fits a field of type `ty`.
    #[must_use]
    pub fn matches_type(&self, ty: FieldType) -> bool {
        matches!(
            (self, ty),
            (Self::Bool(_), FieldType::Bool)
                | (Self::Int(_), FieldType::Int)
                | (Self::Str(_), FieldType::Str)
                | (Self::StrList(_), FieldType::StrList)
                | (Self::Expr(_), FieldType::Expr)
                | (Self::Ref(_), FieldType::Ref)
                | (Self::RefList(_), FieldType::RefList)
                | (Self::RefSet(_), FieldType::RefSet)
        )
    }

    /// Referenced names, for values that reference by name.
    pub fn names(&self) -> Box<dyn Iterator<Item = &Name> + '_> {
        match self {
            Self::Ref(name) => Box::new(std::iter::once(name)),
            Self::RefList(names) => Box::new(names.iter()),
            Self::RefSet(names) => Box::new(names.iter()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Rewrite every referenced name through `map`.
    #[must_use]
    pub fn map_names(&self, map: impl Fn(&Name) -> Name) -> Self {
        match self {
            Self::Ref(name) => Self::Ref(map(name)),
            Self::RefList(names) => Self::RefList(names.iter().map(&map).collect()),
            Self::RefSet(names) => Self::RefSet(names.iter().map(&map).collect()),
            other => other.clone(),
        }
    }
}

fn write_names<'a>(
    f: &mut fmt::Formatter<'_>,
    names: impl Iterator<Item = &'a Name>,
    open: &str,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, name) in names.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "'{name}'")?;
    }
    f.write_str(close)
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::StrList(items) => write!(f, "{items:?}"),
            Self::Expr(text) => write!(f, "({text})"),
            Self::Ref(name) => write!(f, "'{name}'"),
            Self::RefList(names) => write_names(f, names.iter(), "[", "]"),
            Self::RefSet(names) => write_names(f, names.iter(), "{", "}"),
            Self::Id(id) => write!(f, "<uuid>{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_references() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let value = FieldValue::Expr(Expression::new("a + b", vec![a, b]));
        assert!(value.references_id(a));
        assert!(value.references_id(b));
        assert!(!FieldValue::Str("a".into()).references_id(a));
    }

    #[test]
    fn test_property_value_serde_shape() {
        let value = PropertyValue::Ref(Name::from("std::str"));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ref", "value": "std::str"}));
        let back: PropertyValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_display() {
        let value = PropertyValue::RefList(vec![Name::from("a::B"), Name::from("a::C")]);
        assert_eq!(value.to_string(), "['a::B', 'a::C']");
        assert_eq!(PropertyValue::Expr("1 + 1".into()).to_string(), "(1 + 1)");
    }
}
