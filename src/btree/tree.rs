//! B-tree handle.
//!
//! Owns the root and performs the root-level bookkeeping around the
//! recursive node operations:
//! - insert: grow a new root when the old one is full
//! - remove: drop an emptied root, promoting its only child
//! - search, traverse and invariant checks

use super::cursor::Traverse;
use super::node::{BTreeNode, CheckWalk};
use crate::error::{Result, TreeError};
use crate::types::{Removal, TreeConfig};
use crate::TreeNode;
use tracing::debug;

/// An in-memory B-tree of unique keys
#[derive(Debug)]
pub struct BTree<K> {
    /// Root node (None means empty tree)
    root: Option<Box<BTreeNode<K>>>,
    /// Tree configuration
    config: TreeConfig,
    /// Number of stored keys
    len: usize,
}

impl<K> BTree<K> {
    /// Create an empty B-tree with minimum degree `t`
    pub fn new(min_degree: usize) -> Result<Self> {
        Self::with_config(TreeConfig::new(min_degree))
    }

    /// Create an empty B-tree from a validated configuration
    pub fn with_config(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            root: None,
            config,
            len: 0,
        })
    }

    /// Get the minimum degree
    pub fn min_degree(&self) -> usize {
        self.config.min_degree
    }

    /// Get the tree configuration
    pub fn config(&self) -> TreeConfig {
        self.config
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no keys
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of levels (0 for an empty tree)
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self.root.as_deref();
        while let Some(current) = node {
            height += 1;
            node = current.children.first().map(|child| child.as_ref());
        }
        height
    }

    /// Get the root node
    pub fn root(&self) -> Option<&BTreeNode<K>> {
        self.root.as_deref()
    }

    /// Walk the nodes top-down, one line per node.
    ///
    /// Each call starts a fresh traversal from the root.
    pub fn traverse(&self) -> Traverse<'_, K> {
        Traverse::new(self.root.as_deref())
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }
}

impl<K: Ord + Clone> BTree<K> {
    /// Find the node holding `key`
    pub fn search(&self, key: &K) -> Option<&BTreeNode<K>> {
        self.root.as_deref()?.search(key)
    }

    /// Check if a key is stored
    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Insert a key.
    ///
    /// Returns `false` and leaves the tree untouched if the key is already
    /// stored.
    pub fn insert(&mut self, key: K) -> bool {
        if self.contains(&key) {
            debug!("key already present; insert skipped");
            return false;
        }

        let config = self.config;
        self.root = Some(match self.root.take() {
            None => {
                let mut root = BTreeNode::new(true, config);
                root.keys.push(key);
                Box::new(root)
            }
            Some(root) if root.is_full(config) => {
                // Split the full root before descending so every node on
                // the way down has room for a promoted median.
                let mut new_root = BTreeNode::new(false, config);
                new_root.children.push(root);
                new_root.split_child(0, config);
                new_root.insert_non_full(key, config);
                debug!("b-tree root split");
                Box::new(new_root)
            }
            Some(mut root) => {
                root.insert_non_full(key, config);
                root
            }
        });

        self.len += 1;
        true
    }

    /// Remove a key.
    ///
    /// A missing key or an empty tree is reported through [`Removal`], never
    /// as an error.
    pub fn remove(&mut self, key: &K) -> Removal {
        let config = self.config;
        let Some(root) = self.root.as_mut() else {
            debug!("remove on an empty b-tree");
            return Removal::EmptyTree;
        };

        let removed = root.remove(key, config);

        // A merge at the root can leave it keyless even when the key was
        // missing.
        if root.keys.is_empty() {
            let promoted = if root.is_leaf {
                None
            } else {
                root.children.pop()
            };
            self.root = promoted;
            debug!("b-tree root shrunk");
        }

        if removed {
            self.len -= 1;
            Removal::Removed
        } else {
            debug!("key does not exist in the b-tree");
            Removal::KeyNotFound
        }
    }

    /// All keys in increasing order
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len);
        if let Some(root) = &self.root {
            root.collect_keys(&mut keys);
        }
        keys
    }

    /// Export the tree structure for visualization
    pub fn snapshot(&self) -> Option<TreeNode<K>> {
        self.root.as_deref().map(snapshot_node)
    }

    /// Verify ordering, occupancy, height balance and the key count
    pub fn check_invariants(&self) -> Result<()> {
        let Some(root) = &self.root else {
            if self.len != 0 {
                return Err(TreeError::corruption(format!(
                    "empty b-tree reports {} keys",
                    self.len
                )));
            }
            return Ok(());
        };

        let mut walk = CheckWalk::default();
        root.check(self.config, 0, (None, None), &mut walk)?;

        if walk.keys != self.len {
            return Err(TreeError::corruption(format!(
                "b-tree holds {} keys but reports {}",
                walk.keys, self.len
            )));
        }
        Ok(())
    }
}

fn snapshot_node<K: Clone>(node: &BTreeNode<K>) -> TreeNode<K> {
    TreeNode {
        is_leaf: node.is_leaf(),
        keys: node.keys().to_vec(),
        children: node.children().map(snapshot_node).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MAX_MIN_DEGREE;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn build(t: usize, keys: impl IntoIterator<Item = i32>) -> Result<BTree<i32>> {
        let mut tree = BTree::new(t)?;
        for key in keys {
            assert!(tree.insert(key));
        }
        Ok(tree)
    }

    #[test]
    fn test_btree_rejects_small_degree() {
        assert!(matches!(
            BTree::<i32>::new(1),
            Err(TreeError::InvalidDegree { degree: 1, min: 2 })
        ));
        assert!(matches!(
            BTree::<i32>::new(MAX_MIN_DEGREE + 1),
            Err(TreeError::Config(_))
        ));
    }

    #[test]
    fn test_btree_empty() -> Result<()> {
        let mut tree = BTree::<i32>::new(3)?;
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert!(tree.search(&1).is_none());
        assert_eq!(tree.remove(&1), Removal::EmptyTree);
        assert_eq!(tree.traverse().count(), 0);
        assert!(tree.snapshot().is_none());
        tree.check_invariants()
    }

    #[test]
    fn test_btree_root_split_and_traverse() -> Result<()> {
        let tree = build(2, 1..=4)?;
        assert_eq!(tree.height(), 2);

        let lines: Vec<String> = tree.traverse().map(|line| line.to_string()).collect();
        assert_eq!(lines, vec!["[2]", "  [1] (leaf)", "  [3, 4] (leaf)"]);

        // Restartable
        assert_eq!(tree.traverse().count(), 3);
        tree.check_invariants()
    }

    #[test]
    fn test_btree_duplicate_insert_is_noop() -> Result<()> {
        let mut tree = build(2, [5, 1, 9])?;
        assert!(!tree.insert(5));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.keys(), vec![1, 5, 9]);
        tree.check_invariants()
    }

    #[test]
    fn test_btree_search_finds_holding_node() -> Result<()> {
        let tree = build(2, 1..=10)?;
        for key in 1..=10 {
            let node = tree.search(&key).expect("key should be found");
            assert!(node.keys().contains(&key));
        }
        assert!(tree.search(&0).is_none());
        assert!(tree.search(&11).is_none());
        Ok(())
    }

    #[test]
    fn test_btree_insert_search_remove_scenario() -> Result<()> {
        let mut tree = build(10, 1..=100)?;
        assert!(tree.search(&6).is_some());

        assert_eq!(tree.remove(&6), Removal::Removed);
        assert!(tree.search(&6).is_none());
        assert_eq!(tree.len(), 99);

        let expected: Vec<i32> = (1..=100).filter(|&k| k != 6).collect();
        assert_eq!(tree.keys(), expected);
        tree.check_invariants()
    }

    #[test]
    fn test_btree_remove_missing_key() -> Result<()> {
        let mut tree = build(3, (0..50).map(|k| k * 2))?;
        assert_eq!(tree.remove(&7), Removal::KeyNotFound);
        assert_eq!(tree.len(), 50);
        tree.check_invariants()?;
        assert_eq!(tree.keys().len(), 50);
        Ok(())
    }

    #[test]
    fn test_btree_round_trip() -> Result<()> {
        let mut tree = build(3, (0..40).map(|k| k * 3))?;
        let before = tree.keys();

        assert!(tree.insert(31));
        assert_eq!(tree.remove(&31), Removal::Removed);

        assert!(!tree.contains(&31));
        assert_eq!(tree.keys(), before);
        tree.check_invariants()
    }

    #[test]
    fn test_btree_drain_both_directions() -> Result<()> {
        for t in 2..=5 {
            let mut tree = build(t, 1..=200)?;
            for key in 1..=100 {
                assert_eq!(tree.remove(&key), Removal::Removed);
                tree.check_invariants()?;
            }
            for key in (101..=200).rev() {
                assert_eq!(tree.remove(&key), Removal::Removed);
                tree.check_invariants()?;
            }
            assert!(tree.is_empty());
            assert_eq!(tree.height(), 0);
        }
        Ok(())
    }

    #[test]
    fn test_btree_shuffled_operations() -> Result<()> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut keys: Vec<i32> = (0..500).collect();
        keys.shuffle(&mut rng);

        let mut tree = build(4, keys.iter().copied())?;
        tree.check_invariants()?;

        keys.shuffle(&mut rng);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(tree.remove(key), Removal::Removed);
            if i % 25 == 0 {
                tree.check_invariants()?;
            }
        }
        assert!(tree.is_empty());
        tree.check_invariants()
    }

    #[test]
    fn test_btree_snapshot() -> Result<()> {
        let tree = build(2, 1..=4)?;
        let snapshot = tree.snapshot().expect("non-empty tree");
        assert!(!snapshot.is_leaf);
        assert_eq!(snapshot.keys, vec![2]);
        assert_eq!(snapshot.children.len(), 2);
        assert_eq!(snapshot.children[1].keys, vec![3, 4]);
        Ok(())
    }

    #[test]
    fn test_btree_clear() -> Result<()> {
        let mut tree = build(2, 1..=20)?;
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.insert(1));
        tree.check_invariants()
    }

    proptest! {
        #[test]
        fn prop_btree_matches_set(
            t in 2usize..6,
            ops in prop::collection::vec((any::<bool>(), 0u16..150), 0..300),
        ) {
            let mut tree = BTree::new(t).unwrap();
            let mut model = BTreeSet::new();

            for (is_insert, key) in ops {
                if is_insert {
                    prop_assert_eq!(tree.insert(key), model.insert(key));
                } else {
                    prop_assert_eq!(tree.remove(&key).is_removed(), model.remove(&key));
                }
                let check = tree.check_invariants();
                prop_assert!(check.is_ok(), "{:?}", check);
            }

            prop_assert_eq!(tree.keys(), model.iter().copied().collect::<Vec<_>>());
            prop_assert_eq!(tree.len(), model.len());
        }
    }
}
