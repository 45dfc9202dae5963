//! Object identity: stable ids and qualified names.
//!
//! Names take two shapes:
//!
//! 1. **Qualified** - `module::local`, for top-level objects
//! 2. **Derived** - `Owner.local`, for objects owned through a refdict;
//!    the owner's full name is embedded, so renaming the owner renames
//!    every descendant
//!
//! Modules themselves use a bare name (`default`).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable object identity, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// A fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id for an object that has no recorded identity yet.
    ///
    /// Derived from the name so that loading the same document twice yields
    /// the same snapshot.
    #[must_use]
    pub fn derived_from(name: &Name) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_str().as_bytes()))
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ObjectId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Module part of a qualified name (`default` for `default::Foo.bar`).
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.0.split_once("::").map(|(module, _)| module)
    }

    /// Name of the owning object for derived names.
    #[must_use]
    pub fn owner(&self) -> Option<Name> {
        let unqualified = self.unqualified();
        let (head, _) = unqualified.rsplit_once('.')?;
        let offset = self.0.len() - unqualified.len();
        Some(Self(format!("{}{head}", &self.0[..offset])))
    }

    /// The last segment: `bar` for `default::Foo.bar`, `Foo` for `default::Foo`.
    #[must_use]
    pub fn local(&self) -> &str {
        let unqualified = self.unqualified();
        unqualified
            .rsplit_once('.')
            .map_or(unqualified, |(_, local)| local)
    }

    /// Derived name of a child owned by this object.
    #[must_use]
    pub fn child(&self, local: &str) -> Name {
        Self(format!("{}.{local}", self.0))
    }

    /// Whether `self` is a (transitive) derived name of `owner`.
    #[must_use]
    pub fn is_derived_from(&self, owner: &Name) -> bool {
        self.0.len() > owner.0.len()
            && self.0.starts_with(owner.as_str())
            && self.0.as_bytes()[owner.0.len()] == b'.'
    }

    /// Replace the `old` owner prefix with `new`, if `self` derives from `old`.
    #[must_use]
    pub fn rebase(&self, old: &Name, new: &Name) -> Option<Name> {
        if self.is_derived_from(old) {
            Some(Self(format!("{}{}", new.0, &self.0[old.0.len()..])))
        } else {
            None
        }
    }

    /// Owner names from the innermost outwards.
    pub fn owners(&self) -> impl Iterator<Item = Name> {
        std::iter::successors(self.owner(), Name::owner)
    }

    fn unqualified(&self) -> &str {
        self.0.split_once("::").map_or(self.0.as_str(), |(_, rest)| rest)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
