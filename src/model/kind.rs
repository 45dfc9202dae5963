//! The closed set of schema object kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::descriptor::{self, KindDescriptor};

/// Schema object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Module,
    Annotation,
    Function,
    Constraint,
    ScalarType,
    Property,
    Link,
    ObjectType,
    Index,
}

/// Kinds in the order the delta builder processes them.
///
/// Leaf kinds come first so that comparing a later kind can rely on the
/// renames already decided for the kinds it references.
pub const DELTA_ORDER: &[ObjectKind] = &[
    ObjectKind::Module,
    ObjectKind::Annotation,
    ObjectKind::Function,
    ObjectKind::Constraint,
    ObjectKind::ScalarType,
    ObjectKind::Property,
    ObjectKind::Link,
    ObjectKind::ObjectType,
];

impl ObjectKind {
    /// All kinds, in declaration order.
    pub const ALL: [ObjectKind; 9] = [
        Self::Module,
        Self::Annotation,
        Self::Function,
        Self::Constraint,
        Self::ScalarType,
        Self::Property,
        Self::Link,
        Self::ObjectType,
        Self::Index,
    ];

    /// Human-readable kind name, as used in prompts and error messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Annotation => "annotation",
            Self::Function => "function",
            Self::Constraint => "constraint",
            Self::ScalarType => "scalar type",
            Self::Property => "property",
            Self::Link => "link",
            Self::ObjectType => "object type",
            Self::Index => "index",
        }
    }

    /// Identifier form used in documents and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Annotation => "annotation",
            Self::Function => "function",
            Self::Constraint => "constraint",
            Self::ScalarType => "scalar_type",
            Self::Property => "property",
            Self::Link => "link",
            Self::ObjectType => "object_type",
            Self::Index => "index",
        }
    }

    /// The static descriptor for this kind.
    #[must_use]
    pub fn descriptor(self) -> &'static KindDescriptor {
        descriptor::descriptor(self)
    }

    /// Whether objects of this kind carry `bases` and `ancestors`.
    #[must_use]
    pub fn is_inheriting(self) -> bool {
        self.descriptor().inheriting
    }

    /// Whether objects of this kind hold stored data, so dropping them loses it.
    #[must_use]
    pub const fn is_data_bearing(self) -> bool {
        matches!(self, Self::ObjectType | Self::Property | Self::Link)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown object kind: {s}"))
    }
}
