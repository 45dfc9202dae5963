//! Per-run comparison state.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use crate::context::{map_renamed, DiffContext};
use crate::model::{Name, ObjectId};

type PairKey = (ObjectId, ObjectId);

/// Memo, recursion guard and rename view for one delta run.
///
/// A fresh context is created for every `delta_objects` call, so memoized
/// scores never outlive the renames they were computed under.
#[derive(Debug, Clone, Default)]
pub struct ComparisonContext {
    renames: IndexMap<Name, Name>,
    memo: HashMap<PairKey, f64>,
    in_progress: HashSet<PairKey>,
    hits: usize,
}

impl ComparisonContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the renames decided so far in `session`.
    #[must_use]
    pub fn from_session(session: &DiffContext) -> Self {
        Self {
            renames: session.renames.clone(),
            ..Self::default()
        }
    }

    /// Where an old name lives in the new snapshot, as far as is known.
    #[must_use]
    pub fn map_name(&self, old: &Name) -> Name {
        map_renamed(&self.renames, old)
    }

    pub fn record_rename(&mut self, old: Name, new: Name) {
        self.renames.insert(old, new);
        // Scores computed before the rename may have counted it as a change.
        self.memo.clear();
    }

    #[must_use]
    pub fn memoized(&mut self, old: ObjectId, new: ObjectId) -> Option<f64> {
        let score = self.memo.get(&(old, new)).copied();
        if score.is_some() {
            self.hits += 1;
        }
        score
    }

    /// Mark a pair as being compared. Returns false when the pair is already
    /// on the stack, i.e. the reference graph loops back to it.
    pub fn begin(&mut self, old: ObjectId, new: ObjectId) -> bool {
        self.in_progress.insert((old, new))
    }

    pub fn finish(&mut self, old: ObjectId, new: ObjectId, score: f64) {
        self.in_progress.remove(&(old, new));
        self.memo.insert((old, new), score);
    }

    /// Whether `(old, new)` is currently being compared further up the stack.
    #[must_use]
    pub fn is_comparing(&self, old: ObjectId, new: ObjectId) -> bool {
        self.in_progress.contains(&(old, new))
    }

    #[must_use]
    pub fn memo_hits(&self) -> usize {
        self.hits
    }

    #[must_use]
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_detects_reentry() {
        let (a, b) = (ObjectId::new(), ObjectId::new());
        let mut ctx = ComparisonContext::new();
        assert!(ctx.begin(a, b));
        assert!(!ctx.begin(a, b));
        assert!(ctx.is_comparing(a, b));
        ctx.finish(a, b, 0.5);
        assert!(!ctx.is_comparing(a, b));
        assert_eq!(ctx.memoized(a, b), Some(0.5));
        assert_eq!(ctx.memo_hits(), 1);
    }

    #[test]
    fn test_rename_invalidates_memo() {
        let (a, b) = (ObjectId::new(), ObjectId::new());
        let mut ctx = ComparisonContext::new();
        ctx.finish(a, b, 0.7);
        ctx.record_rename(Name::from("default::A"), Name::from("default::B"));
        assert_eq!(ctx.memoized(a, b), None);
        assert_eq!(ctx.map_name(&Name::from("default::A.x")), Name::from("default::B.x"));
    }
}
