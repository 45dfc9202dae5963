//! Pair assignment for the delta engine.
//!
//! Both strategies receive only acceptable pairs (those that would become an
//! alter or an unchanged match) and return a 1:1 subset of them.

use std::collections::{HashMap, HashSet};

use crate::error::{DeltaError, Result};

/// One candidate pairing between an old and a new object, by position in
/// the survivor lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoredPair {
    pub old: usize,
    pub new: usize,
    pub similarity: f64,
    /// Decided upstream (session rename or guidance); wins over any score.
    pub forced: bool,
}

impl ScoredPair {
    /// A perfect unforced score: both sides are claimed but nothing is emitted.
    pub(crate) fn is_unchanged(&self) -> bool {
        !self.forced && self.similarity >= 1.0
    }
}

/// Claim pairs in the given order, skipping any whose old or new side is
/// already taken.
///
/// `sorted` must already be in priority order.
pub(crate) fn greedy_assignment(sorted: &[ScoredPair]) -> Vec<ScoredPair> {
    let mut used_old: HashSet<usize> = HashSet::new();
    let mut used_new: HashSet<usize> = HashSet::new();
    let mut result = Vec::new();

    for pair in sorted {
        if used_old.contains(&pair.old) || used_new.contains(&pair.new) {
            continue;
        }
        used_old.insert(pair.old);
        used_new.insert(pair.new);
        result.push(*pair);
    }

    result
}

/// Maximum total similarity assignment (Kuhn-Munkres).
///
/// Forced pairs weigh more than any scored pair, so they are always kept
/// when they do not conflict with each other.
pub(crate) fn optimal_assignment(pairs: &[ScoredPair], old_len: usize, new_len: usize) -> Result<Vec<ScoredPair>> {
    use pathfinding::kuhn_munkres::kuhn_munkres_min;
    use pathfinding::matrix::Matrix;

    if pairs.is_empty() || old_len == 0 || new_len == 0 {
        return Ok(Vec::new());
    }

    let mut edges: HashMap<(usize, usize), ScoredPair> = HashMap::with_capacity(pairs.len());
    for pair in pairs {
        edges.insert((pair.old, pair.new), *pair);
    }

    // Scale to i64 and negate: the solver minimizes.
    let n = old_len.max(new_len);
    let scale = 1_000_000i64;
    let weights: Vec<Vec<i64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| match edges.get(&(i, j)) {
                    Some(pair) => {
                        let weight = if pair.forced { 2.0 } else { pair.similarity };
                        -((weight * scale as f64) as i64)
                    }
                    None if i < old_len && j < new_len => scale,
                    None => 0,
                })
                .collect()
        })
        .collect();

    let matrix = Matrix::from_rows(weights)
        .map_err(|e| DeltaError::validation(format!("building assignment matrix: {e}")))?;
    let (_, assignment) = kuhn_munkres_min(&matrix);

    Ok(assignment
        .into_iter()
        .enumerate()
        .filter_map(|(old, new)| edges.get(&(old, new)).copied())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(old: usize, new: usize, similarity: f64) -> ScoredPair {
        ScoredPair {
            old,
            new,
            similarity,
            forced: false,
        }
    }

    #[test]
    fn test_greedy_takes_best_first() {
        let sorted = vec![pair(0, 0, 0.9), pair(0, 1, 0.85), pair(1, 0, 0.8)];
        let result = greedy_assignment(&sorted);
        assert_eq!(result, vec![pair(0, 0, 0.9)]);
    }

    #[test]
    fn test_optimal_maximizes_total() {
        let pairs = vec![pair(0, 0, 0.9), pair(0, 1, 0.85), pair(1, 0, 0.8)];
        let mut result = optimal_assignment(&pairs, 2, 2).unwrap();
        result.sort_by_key(|p| p.old);
        assert_eq!(result, vec![pair(0, 1, 0.85), pair(1, 0, 0.8)]);
    }

    #[test]
    fn test_optimal_keeps_forced_pair() {
        let mut forced = pair(0, 1, 0.3);
        forced.forced = true;
        let pairs = vec![pair(0, 0, 0.95), forced];
        let result = optimal_assignment(&pairs, 1, 2).unwrap();
        assert_eq!(result, vec![forced]);
    }

    #[test]
    fn test_optimal_handles_rectangular_input() {
        let pairs = vec![pair(0, 2, 0.7)];
        let result = optimal_assignment(&pairs, 1, 3).unwrap();
        assert_eq!(result, vec![pair(0, 2, 0.7)]);
    }
}
