//! Name-keyed, insertion-ordered set of trees.

use std::collections::HashSet;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tree::{Tree, TwistVector};

/// All trees taking part in one optimization.
///
/// Built once at load time and never structurally changed afterwards; only the
/// rotations inside each tree move. Iteration follows insertion order, and the
/// first tree inserted is the anchor.
#[derive(Debug, Default)]
pub struct TreeCollection {
    trees: IndexMap<String, Tree>,
}

impl TreeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tree. Names are unique within a collection.
    pub fn insert(&mut self, tree: Tree) -> DomainResult<()> {
        if self.trees.contains_key(tree.name()) {
            return Err(DomainError::DuplicateTree(tree.name().to_string()));
        }
        self.trees.insert(tree.name().to_string(), tree);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Tree> {
        self.trees.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tree> {
        self.trees.get_mut(name)
    }

    pub fn get_index(&self, index: usize) -> Option<&Tree> {
        self.trees.get_index(index).map(|(_, tree)| tree)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Tree> {
        self.trees.get_index_mut(index).map(|(_, tree)| tree)
    }

    /// The first-loaded tree.
    pub fn anchor(&self) -> Option<&Tree> {
        self.get_index(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tree> {
        self.trees.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    /// Leaf sequences of every tree, in collection order.
    pub fn leaf_orders(&self) -> Vec<Vec<&str>> {
        self.trees.values().map(Tree::leaves).collect()
    }

    /// Current twist vector of every tree, in collection order.
    pub fn twists(&self) -> Vec<TwistVector> {
        self.trees.values().map(Tree::twists).collect()
    }

    /// Check that every label the pairwise metrics look up has a rank.
    ///
    /// For each pair `(a, b)` in collection order, the metrics rank the
    /// first `min(len a, len b)` labels of `a` against `b`; all of them must
    /// occur in `b`.
    pub fn check_shared_leaves(&self) -> DomainResult<()> {
        let label_sets: Vec<(&str, Vec<&str>, HashSet<&str>)> = self
            .trees
            .values()
            .map(|tree| {
                let leaves = tree.leaves();
                let set = leaves.iter().copied().collect();
                (tree.name(), leaves, set)
            })
            .collect();

        for (a, b) in label_sets.iter().tuple_combinations() {
            let compared = a.1.len().min(b.1.len());
            let missing: Vec<String> = a.1[..compared]
                .iter()
                .filter(|label| !b.2.contains(*label))
                .map(|label| label.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(DomainError::UnmatchedLeaves {
                    left: a.0.to_string(),
                    right: b.0.to_string(),
                    labels: missing,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arena::Topology as T;

    fn tree(name: &str, labels: &[&str]) -> Tree {
        Tree::new(name, &T::group(labels.iter().map(|l| T::leaf(*l))))
    }

    #[test]
    fn test_insert_preserves_order_and_anchor() {
        let mut trees = TreeCollection::new();
        trees.insert(tree("second", &["A", "B"])).unwrap();
        trees.insert(tree("first", &["B", "A"])).unwrap();

        assert_eq!(trees.names().collect::<Vec<_>>(), vec!["second", "first"]);
        assert_eq!(trees.anchor().unwrap().name(), "second");
        assert_eq!(trees.leaf_orders(), vec![vec!["A", "B"], vec!["B", "A"]]);
    }

    #[test]
    fn test_insert_rejects_duplicate_names() {
        let mut trees = TreeCollection::new();
        trees.insert(tree("t", &["A", "B"])).unwrap();

        let result = trees.insert(tree("t", &["B", "A"]));

        assert_eq!(result, Err(DomainError::DuplicateTree("t".into())));
        assert_eq!(trees.len(), 1);
    }

    #[test]
    fn test_check_shared_leaves() {
        let mut trees = TreeCollection::new();
        trees.insert(tree("a", &["A", "B", "C"])).unwrap();
        trees.insert(tree("b", &["C", "B", "A", "X"])).unwrap();
        assert!(trees.check_shared_leaves().is_ok());

        trees.insert(tree("c", &["A", "Z"])).unwrap();
        match trees.check_shared_leaves() {
            Err(DomainError::UnmatchedLeaves { left, right, labels }) => {
                // a is compared against c on its first two labels
                assert_eq!((left.as_str(), right.as_str()), ("a", "c"));
                assert_eq!(labels, vec!["B".to_string()]);
            }
            other => panic!("expected unmatched leaves, got {other:?}"),
        }
    }

    #[test]
    fn test_check_shared_leaves_covers_longer_earlier_tree() {
        let mut trees = TreeCollection::new();
        trees.insert(tree("a", &["X", "A", "B"])).unwrap();
        trees.insert(tree("b", &["A", "B"])).unwrap();

        match trees.check_shared_leaves() {
            Err(DomainError::UnmatchedLeaves { left, right, labels }) => {
                assert_eq!((left.as_str(), right.as_str()), ("a", "b"));
                assert_eq!(labels, vec!["X".to_string()]);
            }
            other => panic!("expected unmatched leaves, got {other:?}"),
        }
    }

    #[test]
    fn test_check_shared_leaves_ignores_labels_past_compared_prefix() {
        let mut trees = TreeCollection::new();
        trees.insert(tree("a", &["A", "B", "X"])).unwrap();
        trees.insert(tree("b", &["B", "A"])).unwrap();

        assert!(trees.check_shared_leaves().is_ok());
    }
}
