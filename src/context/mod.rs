//! Diff session state.
//!
//! One [`DiffContext`] is threaded through every delta run of a session. It
//! remembers renames decided so far and carries the [`Guidance`] a human has
//! supplied by rejecting proposals. Nothing in it is shared between sessions.

mod guidance;

pub use guidance::Guidance;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Name;

/// Request-scoped state for one diff session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffContext {
    /// Decided renames, old name to new name.
    #[serde(default)]
    pub renames: IndexMap<Name, Name>,
    #[serde(default)]
    pub guidance: Guidance,
}

impl DiffContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_guidance(mut self, guidance: Guidance) -> Self {
        self.guidance = guidance;
        self
    }

    pub fn record_rename(&mut self, old: Name, new: Name) {
        self.renames.insert(old, new);
    }

    #[must_use]
    pub fn renamed_to(&self, old: &Name) -> Option<&Name> {
        self.renames.get(old)
    }

    /// Where `old` lives after the renames decided so far.
    ///
    /// Exact renames win; otherwise the innermost renamed owner is rebased,
    /// so `Foo.bar` follows `Foo -> Qux` to `Qux.bar`.
    #[must_use]
    pub fn map_name(&self, old: &Name) -> Name {
        map_renamed(&self.renames, old)
    }
}

pub(crate) fn map_renamed(renames: &IndexMap<Name, Name>, old: &Name) -> Name {
    if let Some(new) = renames.get(old) {
        return new.clone();
    }
    for owner in old.owners() {
        if let Some(new_owner) = renames.get(&owner) {
            if let Some(rebased) = old.rebase(&owner, new_owner) {
                return rebased;
            }
        }
    }
    old.clone()
}
