//! B+-tree handle.
//!
//! Owns the node arena and the root id, and handles the root-level cases
//! the node operations cannot:
//! - insert: create the first leaf, wrap an overflowing root in a new one
//! - remove: drop an emptied leaf root, collapse a single-child root
//! - search, traversal, leaf-chain walks and invariant checks

use super::arena::NodeArena;
use super::cursor::{Leaves, Traverse};
use super::node::{BPlusNode, InternalNode, KeySequence, LeafNode};
use crate::error::{Result, TreeError};
use crate::types::{NodeId, Removal, TreeConfig};
use crate::TreeNode;
use tracing::debug;

/// An in-memory B+-tree of unique keys
#[derive(Debug)]
pub struct BPlusTree<K> {
    /// Owner of every node
    arena: NodeArena<K>,
    /// Root node (None means empty tree)
    root: Option<NodeId>,
    /// Tree configuration
    config: TreeConfig,
    /// Number of stored keys
    len: usize,
}

impl<K> BPlusTree<K> {
    /// Create an empty B+-tree with minimum degree `t`
    pub fn new(min_degree: usize) -> Result<Self> {
        Self::with_config(TreeConfig::new(min_degree))
    }

    /// Create an empty B+-tree from a validated configuration
    pub fn with_config(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            arena: NodeArena::new(),
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
        let mut node = self.root;
        while let Some(id) = node {
            height += 1;
            node = self.arena.get(id).children().first().copied();
        }
        height
    }

    /// Get the root node id
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Look up a node by id, e.g. to follow a leaf's `next` link
    pub fn node(&self, id: NodeId) -> Option<&BPlusNode<K>> {
        self.arena.try_get(id)
    }

    /// Walk the nodes top-down, one line per node.
    ///
    /// Each call starts a fresh traversal from the root.
    pub fn traverse(&self) -> Traverse<'_, K> {
        Traverse::new(&self.arena, self.root)
    }

    /// Walk the leaf chain left to right
    pub fn leaves(&self) -> Leaves<'_, K> {
        Leaves::forward(&self.arena, self.edge_leaf(|children| children.first()))
    }

    /// Walk the leaf chain right to left through `prev` links
    pub fn leaves_rev(&self) -> Leaves<'_, K> {
        Leaves::backward(&self.arena, self.edge_leaf(|children| children.last()))
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.len = 0;
    }

    /// Descend from the root always taking the child `pick` chooses
    fn edge_leaf(&self, pick: impl Fn(&[NodeId]) -> Option<&NodeId>) -> Option<NodeId> {
        let mut id = self.root?;
        while let BPlusNode::Internal(node) = self.arena.get(id) {
            id = *pick(&node.children)?;
        }
        Some(id)
    }
}

impl<K: Ord + Clone> BPlusTree<K> {
    /// Find the leaf holding `key`
    pub fn search(&self, key: &K) -> Option<&LeafNode<K>> {
        let mut id = self.root?;
        loop {
            match self.arena.get(id) {
                BPlusNode::Internal(node) => {
                    // Past the last routing key means past the tree's maximum
                    id = *node.children.get(node.find_key(key))?;
                }
                BPlusNode::Leaf(leaf) => return leaf.contains(key).then_some(leaf),
            }
        }
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
        match self.root {
            None => {
                let leaf = self.arena.alloc(BPlusNode::Leaf(LeafNode::new(vec![key])));
                self.root = Some(leaf);
            }
            Some(root) => {
                self.arena.insert(root, key, config);

                if self.arena.get(root).len() > config.bplus_max_keys() {
                    self.grow_root(root);
                }
            }
        }

        self.len += 1;
        true
    }

    /// Wrap an overflowing root in a new internal root and split it
    fn grow_root(&mut self, old_root: NodeId) {
        let Some(max) = self.arena.get(old_root).max_key().cloned() else {
            unreachable!("overflowing b+ tree root holds no keys");
        };
        let new_root = self
            .arena
            .alloc(BPlusNode::Internal(InternalNode::new(vec![max], vec![old_root])));
        self.arena.adopt(new_root, &[old_root]);
        self.arena.split_child(new_root, 0);
        self.root = Some(new_root);
        debug!(height = self.height(), "b+ tree root split");
    }

    /// Remove a key.
    ///
    /// A missing key or an empty tree is reported through [`Removal`], never
    /// as an error.
    pub fn remove(&mut self, key: &K) -> Removal {
        let Some(root) = self.root else {
            debug!("remove on an empty b+ tree");
            return Removal::EmptyTree;
        };

        if !self.arena.remove(root, key, self.config) {
            debug!("key does not exist in the b+ tree");
            return Removal::KeyNotFound;
        }
        self.len -= 1;

        match self.arena.get(root) {
            BPlusNode::Leaf(leaf) if leaf.is_empty() => {
                self.arena.release(root);
                self.root = None;
                debug!("b+ tree emptied");
            }
            BPlusNode::Internal(node) if node.children.len() == 1 => {
                let child = node.children[0];
                self.arena.release(root);
                self.arena.get_mut(child).set_parent(None);
                self.root = Some(child);
                debug!("b+ tree root collapsed");
            }
            _ => {}
        }

        Removal::Removed
    }

    /// All stored keys in increasing order, read off the leaf chain
    pub fn traverse_leaves(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len);
        for leaf in self.leaves() {
            keys.extend_from_slice(leaf);
        }
        keys
    }

    /// All keys in increasing order
    pub fn keys(&self) -> Vec<K> {
        self.traverse_leaves()
    }

    /// Export the tree structure for visualization
    pub fn snapshot(&self) -> Option<TreeNode<K>> {
        self.root.map(|root| self.snapshot_node(root))
    }

    fn snapshot_node(&self, id: NodeId) -> TreeNode<K> {
        let node = self.arena.get(id);
        TreeNode {
            is_leaf: node.is_leaf(),
            keys: node.keys().to_vec(),
            children: node
                .children()
                .iter()
                .map(|&child| self.snapshot_node(child))
                .collect(),
        }
    }

    /// Verify ordering, occupancy, height balance, routing keys, parent
    /// links, the leaf chain and the key count
    pub fn check_invariants(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.len != 0 || self.arena.live() != 0 {
                return Err(TreeError::corruption(format!(
                    "empty b+ tree reports {} keys and {} nodes",
                    self.len,
                    self.arena.live()
                )));
            }
            return Ok(());
        };

        let mut walk = CheckWalk::default();
        self.check_node(root, None, 0, None, &mut walk)?;

        if walk.nodes != self.arena.live() {
            return Err(TreeError::corruption(format!(
                "b+ tree reaches {} nodes but {} are allocated",
                walk.nodes,
                self.arena.live()
            )));
        }
        if walk.keys != self.len {
            return Err(TreeError::corruption(format!(
                "b+ tree holds {} keys but reports {}",
                walk.keys, self.len
            )));
        }
        self.check_leaf_chain(&walk.leaves)
    }

    fn check_node(
        &self,
        id: NodeId,
        parent: Option<NodeId>,
        depth: usize,
        lower: Option<&K>,
        walk: &mut CheckWalk,
    ) -> Result<()> {
        let (min_keys, max_keys) = (self.config.bplus_min_keys(), self.config.bplus_max_keys());
        let is_root = depth == 0;
        let node = self.arena.get(id);
        let len = node.len();
        walk.nodes += 1;

        if node.parent() != parent {
            return Err(TreeError::corruption(format!(
                "b+ tree node {} has parent {:?}, expected {:?}",
                id,
                node.parent(),
                parent
            )));
        }
        if len > max_keys {
            return Err(TreeError::corruption(format!(
                "b+ tree node {} holds {} keys (max {})",
                id, len, max_keys
            )));
        }
        if is_root && len == 0 {
            return Err(TreeError::corruption("b+ tree root holds no keys"));
        }
        if !is_root && len < min_keys {
            return Err(TreeError::corruption(format!(
                "b+ tree node {} holds {} keys (min {})",
                id, len, min_keys
            )));
        }
        if node.keys().windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(TreeError::corruption(format!(
                "b+ tree node {} has unordered keys",
                id
            )));
        }
        if let (Some(low), Some(first)) = (lower, node.keys().first()) {
            if first <= low {
                return Err(TreeError::corruption(format!(
                    "b+ tree node {} has a key below its left neighbor's routing key",
                    id
                )));
            }
        }

        match node {
            BPlusNode::Leaf(_) => {
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(TreeError::corruption(format!(
                            "b+ tree leaves at depths {} and {}",
                            expected, depth
                        )));
                    }
                    Some(_) => {}
                }
                walk.leaves.push(id);
                walk.keys += len;
            }
            BPlusNode::Internal(internal) => {
                if internal.children.len() != len {
                    return Err(TreeError::corruption(format!(
                        "b+ tree internal node {} has {} routing keys for {} children",
                        id,
                        len,
                        internal.children.len()
                    )));
                }
                if is_root && len < 2 {
                    return Err(TreeError::corruption("b+ tree internal root has one child"));
                }

                let routed = internal.children.iter().zip(&internal.keys);
                for (i, (&child, routing)) in routed.enumerate() {
                    if self.arena.get(child).max_key() != Some(routing) {
                        return Err(TreeError::corruption(format!(
                            "b+ tree node {} routing key {} does not match child {}'s maximum",
                            id, i, child
                        )));
                    }
                    let low = if i == 0 { lower } else { internal.keys.get(i - 1) };
                    self.check_node(child, Some(id), depth + 1, low, walk)?;
                }
            }
        }
        Ok(())
    }

    /// The leaves reached top-down must be exactly the `next`/`prev` chain
    fn check_leaf_chain(&self, leaves: &[NodeId]) -> Result<()> {
        for (i, &id) in leaves.iter().enumerate() {
            let leaf = self.arena.leaf(id);
            let expected_prev = i.checked_sub(1).map(|j| leaves[j]);
            let expected_next = leaves.get(i + 1).copied();

            if leaf.prev() != expected_prev || leaf.next() != expected_next {
                return Err(TreeError::corruption(format!(
                    "b+ tree leaf {} is linked to {:?}/{:?}, expected {:?}/{:?}",
                    id,
                    leaf.prev(),
                    leaf.next(),
                    expected_prev,
                    expected_next
                )));
            }
        }

        let chain = self.traverse_leaves();
        if chain.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(TreeError::corruption("b+ tree leaf chain is not increasing"));
        }
        Ok(())
    }
}

/// Running state of an invariant check
#[derive(Debug, Default)]
struct CheckWalk {
    leaf_depth: Option<usize>,
    leaves: Vec<NodeId>,
    keys: usize,
    nodes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MAX_MIN_DEGREE;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn build(t: usize, keys: impl IntoIterator<Item = i32>) -> Result<BPlusTree<i32>> {
        let mut tree = BPlusTree::new(t)?;
        for key in keys {
            assert!(tree.insert(key));
        }
        Ok(tree)
    }

    fn lines(tree: &BPlusTree<i32>) -> Vec<String> {
        tree.traverse().map(|line| line.to_string()).collect()
    }

    #[test]
    fn test_bplus_rejects_small_degree() {
        assert!(matches!(
            BPlusTree::<i32>::new(0),
            Err(TreeError::InvalidDegree { degree: 0, min: 2 })
        ));
        assert!(matches!(
            BPlusTree::<i32>::with_config(TreeConfig::new(MAX_MIN_DEGREE + 1)),
            Err(TreeError::Config(_))
        ));
    }

    #[test]
    fn test_bplus_empty() -> Result<()> {
        let mut tree = BPlusTree::<i32>::new(4)?;
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert!(tree.search(&1).is_none());
        assert_eq!(tree.remove(&1), Removal::EmptyTree);
        assert_eq!(tree.traverse().count(), 0);
        assert_eq!(tree.leaves().count(), 0);
        assert!(tree.traverse_leaves().is_empty());
        assert!(tree.snapshot().is_none());
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_root_split() -> Result<()> {
        let tree = build(2, 1..=5)?;
        assert_eq!(tree.height(), 2);
        assert_eq!(lines(&tree), vec!["[2, 5]", "  [1, 2] (leaf)", "  [3, 4, 5] (leaf)"]);

        let chain: Vec<&[i32]> = tree.leaves().collect();
        assert_eq!(chain, vec![&[1, 2][..], &[3, 4, 5][..]]);
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_split_threshold_follows_config() -> Result<()> {
        let config = TreeConfig::new(3);
        let mut tree = BPlusTree::with_config(config)?;
        for key in 1..=config.bplus_max_keys() as i32 {
            assert!(tree.insert(key));
        }
        assert_eq!(tree.height(), 1);

        assert!(tree.insert(100));
        assert_eq!(tree.height(), 2);
        let chain: Vec<&[i32]> = tree.leaves().collect();
        assert!(chain.iter().all(|leaf| leaf.len() >= config.bplus_min_keys()));
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_borrow_from_next_keeps_routing_keys() -> Result<()> {
        let mut tree = build(2, 1..=5)?;
        assert_eq!(tree.remove(&1), Removal::Removed);

        assert_eq!(lines(&tree), vec!["[3, 5]", "  [2, 3] (leaf)", "  [4, 5] (leaf)"]);
        assert!(tree.contains(&5));
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_borrow_from_prev() -> Result<()> {
        let mut tree = build(2, [1, 2, 3, 4, 5, 0])?;
        assert_eq!(tree.remove(&5), Removal::Removed);
        assert_eq!(tree.remove(&4), Removal::Removed);

        assert_eq!(lines(&tree), vec!["[1, 3]", "  [0, 1] (leaf)", "  [2, 3] (leaf)"]);
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_merge_collapses_root() -> Result<()> {
        let mut tree = build(2, 1..=5)?;
        assert_eq!(tree.remove(&5), Removal::Removed);
        assert_eq!(tree.remove(&4), Removal::Removed);

        assert_eq!(tree.height(), 1);
        assert_eq!(lines(&tree), vec!["[1, 2, 3] (leaf)"]);
        tree.check_invariants()?;

        let mut tree = build(2, 1..=5)?;
        assert_eq!(tree.remove(&5), Removal::Removed);
        assert_eq!(tree.remove(&1), Removal::Removed);
        assert_eq!(lines(&tree), vec!["[2, 3, 4] (leaf)"]);
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_search_returns_leaf() -> Result<()> {
        let tree = build(3, 1..=50)?;
        for key in 1..=50 {
            let leaf = tree.search(&key).expect("key should be found");
            assert!(leaf.keys().contains(&key));
        }
        assert!(tree.search(&0).is_none());
        assert!(tree.search(&51).is_none());
        Ok(())
    }

    #[test]
    fn test_bplus_follow_leaf_links() -> Result<()> {
        let tree = build(2, 1..=30)?;
        let mut leaf = tree.search(&1).expect("first key");
        let mut seen = leaf.keys().to_vec();
        while let Some(next) = leaf.next() {
            leaf = tree
                .node(next)
                .and_then(BPlusNode::as_leaf)
                .expect("next link points at a leaf");
            seen.extend_from_slice(leaf.keys());
        }
        assert_eq!(seen, (1..=30).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_bplus_duplicate_insert_is_noop() -> Result<()> {
        let mut tree = build(2, 1..=10)?;
        assert!(!tree.insert(7));
        assert_eq!(tree.len(), 10);
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_remove_missing_key() -> Result<()> {
        let mut tree = build(3, (0..40).map(|k| k * 2))?;
        assert_eq!(tree.remove(&5), Removal::KeyNotFound);
        assert_eq!(tree.remove(&1000), Removal::KeyNotFound);
        assert_eq!(tree.remove(&-1), Removal::KeyNotFound);
        assert_eq!(tree.len(), 40);
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_drain_ascending_scenario() -> Result<()> {
        let mut tree = build(4, 1..=100)?;
        tree.check_invariants()?;

        for key in 1..=100 {
            assert!(tree.search(&key).is_some());
            assert_eq!(tree.remove(&key), Removal::Removed);
            assert!(tree.search(&key).is_none());
            assert_eq!(tree.traverse_leaves(), (key + 1..=100).collect::<Vec<_>>());
            tree.check_invariants()?;
        }

        assert!(tree.is_empty());
        assert_eq!(tree.leaves().count(), 0);
        Ok(())
    }

    #[test]
    fn test_bplus_drain_descending() -> Result<()> {
        for t in 2..=5 {
            let mut tree = build(t, 1..=120)?;
            for key in (1..=120).rev() {
                assert_eq!(tree.remove(&key), Removal::Removed);
                tree.check_invariants()?;
            }
            assert!(tree.is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_bplus_leaf_chain_both_directions() -> Result<()> {
        let mut tree = build(3, (1..=200).rev())?;
        for key in (1..=200).step_by(3) {
            assert_eq!(tree.remove(&key), Removal::Removed);
        }

        let forward: Vec<&[i32]> = tree.leaves().collect();
        let mut backward: Vec<&[i32]> = tree.leaves_rev().collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(tree.traverse_leaves(), tree.keys());
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_shuffled_operations() -> Result<()> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
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
    fn test_bplus_round_trip() -> Result<()> {
        let mut tree = build(3, (0..60).map(|k| k * 2))?;
        let before = tree.traverse_leaves();

        assert!(tree.insert(41));
        assert_eq!(tree.remove(&41), Removal::Removed);

        assert!(!tree.contains(&41));
        assert_eq!(tree.traverse_leaves(), before);
        tree.check_invariants()
    }

    #[test]
    fn test_bplus_snapshot_and_clear() -> Result<()> {
        let mut tree = build(2, 1..=5)?;
        let snapshot = tree.snapshot().expect("non-empty tree");
        assert_eq!(snapshot.keys, vec![2, 5]);
        assert_eq!(snapshot.children[0].keys, vec![1, 2]);
        assert!(snapshot.children[0].is_leaf);

        tree.clear();
        assert!(tree.is_empty());
        tree.check_invariants()?;
        assert!(tree.insert(3));
        tree.check_invariants()
    }

    proptest! {
        #[test]
        fn prop_bplus_matches_set(
            t in 2usize..6,
            ops in prop::collection::vec((any::<bool>(), 0u16..150), 0..300),
        ) {
            let mut tree = BPlusTree::new(t).unwrap();
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

            prop_assert_eq!(tree.traverse_leaves(), model.iter().copied().collect::<Vec<_>>());
            let backward: Vec<u16> = tree
                .leaves_rev()
                .flat_map(|leaf| leaf.iter().rev().copied())
                .collect();
            prop_assert_eq!(backward, model.iter().rev().copied().collect::<Vec<_>>());
        }
    }
}
