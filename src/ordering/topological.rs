//! Generic dependency-graph sort.
//!
//! The graph is an [`IndexMap`] so that insertion order is the only tie
//! breaker: two runs over the same input produce the same output.

use indexmap::{IndexMap, IndexSet};
use std::fmt::Display;
use std::hash::Hash;

use crate::error::{DeltaError, Result};

/// One node of a sort graph.
#[derive(Debug, Clone)]
pub struct SortNode<K, T> {
    pub item: T,
    /// Ordering-only predecessors.
    pub deps: IndexSet<K>,
    /// Predecessors whose fields [`normalize`] folds into this node.
    pub merge: IndexSet<K>,
}

impl<K: Hash + Eq, T> SortNode<K, T> {
    pub fn new(item: T) -> Self {
        Self {
            item,
            deps: IndexSet::new(),
            merge: IndexSet::new(),
        }
    }

    #[must_use]
    pub fn with_deps(mut self, deps: impl IntoIterator<Item = K>) -> Self {
        self.deps.extend(deps);
        self
    }

    #[must_use]
    pub fn with_merge(mut self, merge: impl IntoIterator<Item = K>) -> Self {
        self.merge.extend(merge);
        self
    }
}

/// Sort behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortOptions {
    /// Start the traversal only from nodes nothing depends on.
    pub root_only: bool,
    /// Drop edges to keys outside the graph instead of failing.
    pub allow_unresolved: bool,
}

impl SortOptions {
    #[must_use]
    pub fn allow_unresolved() -> Self {
        Self {
            allow_unresolved: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Sort `graph` so that every node comes after its `deps` and `merge`
/// predecessors.
///
/// Fails with [`DeltaError::Cycle`] naming a node on the cycle, or with
/// [`DeltaError::UnresolvedReference`] for edges to unknown keys unless
/// `allow_unresolved` is set.
pub fn sort<K, T>(graph: IndexMap<K, SortNode<K, T>>, options: SortOptions) -> Result<Vec<T>>
where
    K: Hash + Eq + Clone + Display,
{
    let order = sort_indices(&graph, options)?;
    let mut slots: Vec<Option<T>> = graph.into_values().map(|node| Some(node.item)).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Sort like [`sort`], then fold each node's `merge` predecessors into it,
/// visiting predecessors in sorted order.
///
/// `merger(item, pred)` is called once per merge edge after `pred` has
/// itself been normalized.
pub fn normalize<K, T, F>(
    graph: IndexMap<K, SortNode<K, T>>,
    options: SortOptions,
    mut merger: F,
) -> Result<Vec<(K, T)>>
where
    K: Hash + Eq + Clone + Display,
    F: FnMut(&mut T, &T),
{
    let order = sort_indices(&graph, options)?;
    let position: Vec<usize> = {
        let mut position = vec![usize::MAX; graph.len()];
        for (pos, &i) in order.iter().enumerate() {
            position[i] = pos;
        }
        position
    };

    let merges: Vec<Vec<usize>> = graph
        .values()
        .map(|node| {
            let mut preds: Vec<usize> = node
                .merge
                .iter()
                .filter_map(|k| graph.get_index_of(k))
                .collect();
            preds.sort_by_key(|&p| position[p]);
            preds
        })
        .collect();

    let mut slots: Vec<Option<(K, T)>> = graph
        .into_iter()
        .map(|(key, node)| Some((key, node.item)))
        .collect();

    for &i in &order {
        for &pred in &merges[i] {
            // Take the node out so the predecessor can be borrowed alongside it.
            if let Some((key, mut item)) = slots[i].take() {
                if let Some((_, pred_item)) = slots[pred].as_ref() {
                    merger(&mut item, pred_item);
                }
                slots[i] = Some((key, item));
            }
        }
    }

    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

fn sort_indices<K, T>(graph: &IndexMap<K, SortNode<K, T>>, options: SortOptions) -> Result<Vec<usize>>
where
    K: Hash + Eq + Clone + Display,
{
    let adjacency = build_adjacency(graph, options)?;

    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut order = Vec::with_capacity(graph.len());

    if options.root_only {
        let mut has_incoming = vec![false; graph.len()];
        for targets in &adjacency {
            for &t in targets {
                has_incoming[t] = true;
            }
        }
        for root in (0..graph.len()).filter(|&i| !has_incoming[i]) {
            visit(root, &adjacency, &mut marks, &mut order, graph)?;
        }
        // Whatever is left hangs off a cycle; visiting it reports the cycle.
        for stray in 0..graph.len() {
            visit(stray, &adjacency, &mut marks, &mut order, graph)?;
        }
    } else {
        for start in 0..graph.len() {
            visit(start, &adjacency, &mut marks, &mut order, graph)?;
        }
    }

    Ok(order)
}

fn build_adjacency<K, T>(graph: &IndexMap<K, SortNode<K, T>>, options: SortOptions) -> Result<Vec<Vec<usize>>>
where
    K: Hash + Eq + Clone + Display,
{
    graph
        .iter()
        .map(|(key, node)| {
            let mut targets = Vec::with_capacity(node.deps.len() + node.merge.len());
            for dep in node.deps.iter().chain(node.merge.iter()) {
                match graph.get_index_of(dep) {
                    Some(idx) => {
                        if !targets.contains(&idx) {
                            targets.push(idx);
                        }
                    }
                    None if options.allow_unresolved => {}
                    None => return Err(DeltaError::unresolved(key.to_string(), dep.to_string())),
                }
            }
            Ok(targets)
        })
        .collect()
}

/// Iterative post-order DFS from `start`.
fn visit<K, T>(
    start: usize,
    adjacency: &[Vec<usize>],
    marks: &mut [Mark],
    order: &mut Vec<usize>,
    graph: &IndexMap<K, SortNode<K, T>>,
) -> Result<()>
where
    K: Display,
{
    if marks[start] != Mark::Unvisited {
        return Ok(());
    }
    let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
    marks[start] = Mark::Visiting;

    while let Some(frame) = stack.last_mut() {
        let (node, next) = *frame;
        if let Some(&child) = adjacency[node].get(next) {
            frame.1 += 1;
            match marks[child] {
                Mark::Unvisited => {
                    marks[child] = Mark::Visiting;
                    stack.push((child, 0));
                }
                Mark::Visiting => return Err(cycle_at(graph, child)),
                Mark::Done => {}
            }
        } else {
            marks[node] = Mark::Done;
            order.push(node);
            stack.pop();
        }
    }
    Ok(())
}

fn cycle_at<K: Display, T>(graph: &IndexMap<K, SortNode<K, T>>, idx: usize) -> DeltaError {
    let node = graph
        .get_index(idx)
        .map_or_else(|| format!("#{idx}"), |(key, _)| key.to_string());
    DeltaError::cycle(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&'static str, &[&'static str])]) -> IndexMap<&'static str, SortNode<&'static str, &'static str>> {
        edges
            .iter()
            .map(|(key, deps)| (*key, SortNode::new(*key).with_deps(deps.iter().copied())))
            .collect()
    }

    #[test]
    fn test_deps_come_first() {
        let g = graph(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        assert_eq!(sort(g, SortOptions::default()).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_insertion_order_breaks_ties() {
        let g = graph(&[("x", &[]), ("y", &[]), ("z", &[])]);
        assert_eq!(sort(g, SortOptions::default()).unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_cycle_names_a_node() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        match sort(g, SortOptions::default()) {
            Err(DeltaError::Cycle { node }) => assert!(node == "a" || node == "b"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let g = graph(&[("a", &["a"])]);
        assert!(matches!(
            sort(g, SortOptions::default()),
            Err(DeltaError::Cycle { .. })
        ));
    }

    #[test]
    fn test_root_only_still_detects_isolated_cycles() {
        let g = graph(&[("r", &[]), ("a", &["b"]), ("b", &["a"])]);
        let options = SortOptions {
            root_only: true,
            ..SortOptions::default()
        };
        assert!(matches!(sort(g, options), Err(DeltaError::Cycle { .. })));
    }

    #[test]
    fn test_root_only_emits_everything_reachable() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a"])]);
        let options = SortOptions {
            root_only: true,
            ..SortOptions::default()
        };
        assert_eq!(sort(g, options).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unresolved_reference() {
        let g = graph(&[("a", &["missing"])]);
        match sort(g.clone(), SortOptions::default()) {
            Err(DeltaError::UnresolvedReference { node, reference }) => {
                assert_eq!(node, "a");
                assert_eq!(reference, "missing");
            }
            other => panic!("expected unresolved reference, got {other:?}"),
        }
        assert_eq!(sort(g, SortOptions::allow_unresolved()).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_normalize_folds_in_sorted_order() {
        let mut g: IndexMap<&str, SortNode<&str, Vec<&str>>> = IndexMap::new();
        g.insert("child", SortNode::new(vec!["child"]).with_merge(["mid", "base"]));
        g.insert("mid", SortNode::new(vec!["mid"]).with_merge(["base"]));
        g.insert("base", SortNode::new(vec!["base"]));

        let out = normalize(g, SortOptions::default(), |item, pred| {
            for v in pred {
                if !item.contains(v) {
                    item.push(v);
                }
            }
        })
        .unwrap();

        let keys: Vec<&str> = out.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["base", "mid", "child"]);
        assert_eq!(out[2].1, vec!["child", "base", "mid"]);
    }
}
