//! B-tree node and its local rebalancing operations.
//!
//! Every operation here works on a node and its direct children. A node
//! with minimum degree `t` is full at `2t-1` keys and, unless it is the
//! root, never drops below `t-1` keys between operations.
//!
//! Insertion splits full children on the way down so the node being
//! descended into always has room. Removal does the mirror image: before
//! descending into a child holding only `t-1` keys, the child is topped up
//! by borrowing from a sibling or merging with one.

use crate::error::{Result, TreeError};
use crate::types::TreeConfig;
use std::mem;
use tracing::debug;

/// A B-tree node
///
/// Internal nodes own exactly one more child than they hold keys. All keys
/// in `children[i]` sort before `keys[i]`, which sorts before all keys in
/// `children[i + 1]`.
#[derive(Debug)]
pub struct BTreeNode<K> {
    pub(super) keys: Vec<K>,
    pub(super) children: Vec<Box<BTreeNode<K>>>,
    pub(super) is_leaf: bool,
}

impl<K> BTreeNode<K> {
    /// Create an empty node with room for a full node
    pub(super) fn new(is_leaf: bool, config: TreeConfig) -> Self {
        let max_keys = config.btree_max_keys();
        Self {
            keys: Vec::with_capacity(max_keys),
            children: if is_leaf {
                Vec::new()
            } else {
                Vec::with_capacity(max_keys + 1)
            },
            is_leaf,
        }
    }

    /// Keys stored in this node, in increasing order
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Whether this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// Number of keys in this node
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether this node holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Child nodes, left to right (empty for a leaf)
    pub fn children(&self) -> impl Iterator<Item = &BTreeNode<K>> + '_ {
        self.children.iter().map(|child| child.as_ref())
    }

    pub(super) fn is_full(&self, config: TreeConfig) -> bool {
        self.keys.len() >= config.btree_max_keys()
    }

    /// Whether this node can give up a key and stay at or above the minimum
    fn has_spare(&self, config: TreeConfig) -> bool {
        self.keys.len() > config.btree_min_keys()
    }
}

impl<K: Ord + Clone> BTreeNode<K> {
    /// Index of the first key `>= key`, or `len()` if there is none
    pub(super) fn find_key(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k < key)
    }

    /// Find the node holding `key` in this subtree
    pub(super) fn search(&self, key: &K) -> Option<&BTreeNode<K>> {
        let mut node = self;
        loop {
            let idx = node.find_key(key);
            if idx < node.keys.len() && node.keys[idx] == *key {
                return Some(node);
            }
            if node.is_leaf {
                return None;
            }
            node = node.children[idx].as_ref();
        }
    }

    /// Insert `key` into a subtree whose root is known not to be full
    pub(super) fn insert_non_full(&mut self, key: K, config: TreeConfig) {
        let mut idx = self.find_key(&key);
        if self.is_leaf {
            self.keys.insert(idx, key);
            return;
        }

        if self.children[idx].is_full(config) {
            self.split_child(idx, config);
            // The promoted median now sits at keys[idx]
            if self.keys[idx] < key {
                idx += 1;
            }
        }
        self.children[idx].insert_non_full(key, config);
    }

    /// Split the full child at `idx` around its median.
    ///
    /// The child keeps its lower `t-1` keys, a new right sibling takes the
    /// upper `t-1` keys (and upper `t` children), and the median moves up
    /// into this node at `idx`.
    pub(super) fn split_child(&mut self, idx: usize, config: TreeConfig) {
        let t = config.min_degree;
        let (median, sibling) = {
            let child = &mut self.children[idx];
            debug_assert_eq!(child.keys.len(), config.btree_max_keys());

            let mut sibling = BTreeNode::new(child.is_leaf, config);
            sibling.keys = child.keys.split_off(t);
            if !child.is_leaf {
                sibling.children = child.children.split_off(t);
            }
            let median = child.keys.remove(t - 1);
            (median, sibling)
        };

        self.keys.insert(idx, median);
        self.children.insert(idx + 1, Box::new(sibling));
        debug!(idx, "split b-tree child");
    }

    /// Remove `key` from this subtree.
    ///
    /// Returns `false` if the key is not present. The subtree may still have
    /// been rebalanced on the way down in that case; it stays valid either way.
    pub(super) fn remove(&mut self, key: &K, config: TreeConfig) -> bool {
        let idx = self.find_key(key);

        if idx < self.keys.len() && self.keys[idx] == *key {
            if self.is_leaf {
                self.keys.remove(idx);
            } else {
                self.remove_from_internal(idx, config);
            }
            return true;
        }

        if self.is_leaf {
            return false;
        }

        // Descending past the last key; a merge with the left sibling
        // would move the target subtree one slot to the left.
        let was_last = idx == self.keys.len();
        if !self.children[idx].has_spare(config) {
            self.fill(idx, config);
        }

        if was_last && idx > self.keys.len() {
            self.children[idx - 1].remove(key, config)
        } else {
            self.children[idx].remove(key, config)
        }
    }

    /// Remove `keys[idx]` from an internal node
    fn remove_from_internal(&mut self, idx: usize, config: TreeConfig) {
        if self.children[idx].has_spare(config) {
            let pred = self.predecessor(idx);
            self.keys[idx] = pred.clone();
            self.children[idx].remove(&pred, config);
        } else if self.children[idx + 1].has_spare(config) {
            let succ = self.successor(idx);
            self.keys[idx] = succ.clone();
            self.children[idx + 1].remove(&succ, config);
        } else {
            let key = self.keys[idx].clone();
            self.merge(idx);
            self.children[idx].remove(&key, config);
        }
    }

    /// Largest key in the subtree left of `keys[idx]`
    pub(super) fn predecessor(&self, idx: usize) -> K {
        let mut node = self.children[idx].as_ref();
        while !node.is_leaf {
            node = node.children[node.keys.len()].as_ref();
        }
        node.keys[node.keys.len() - 1].clone()
    }

    /// Smallest key in the subtree right of `keys[idx]`
    pub(super) fn successor(&self, idx: usize) -> K {
        let mut node = self.children[idx + 1].as_ref();
        while !node.is_leaf {
            node = node.children[0].as_ref();
        }
        node.keys[0].clone()
    }

    /// Bring `children[idx]` above the minimum key count
    fn fill(&mut self, idx: usize, config: TreeConfig) {
        if idx > 0 && self.children[idx - 1].has_spare(config) {
            self.borrow_from_prev(idx);
        } else if idx < self.keys.len() && self.children[idx + 1].has_spare(config) {
            self.borrow_from_next(idx);
        } else if idx < self.keys.len() {
            self.merge(idx);
        } else {
            self.merge(idx - 1);
        }
    }

    /// Rotate the left sibling's last key through this node into `children[idx]`
    fn borrow_from_prev(&mut self, idx: usize) {
        let (before, after) = self.children.split_at_mut(idx);
        let sibling = &mut before[idx - 1];
        let child = &mut after[0];

        let Some(up) = sibling.keys.pop() else {
            unreachable!("borrowing from an empty b-tree sibling");
        };
        let down = mem::replace(&mut self.keys[idx - 1], up);
        child.keys.insert(0, down);

        if !child.is_leaf {
            if let Some(grandchild) = sibling.children.pop() {
                child.children.insert(0, grandchild);
            }
        }
        debug!(idx, "borrowed from previous b-tree sibling");
    }

    /// Rotate the right sibling's first key through this node into `children[idx]`
    fn borrow_from_next(&mut self, idx: usize) {
        let (before, after) = self.children.split_at_mut(idx + 1);
        let child = &mut before[idx];
        let sibling = &mut after[0];

        let up = sibling.keys.remove(0);
        let down = mem::replace(&mut self.keys[idx], up);
        child.keys.push(down);

        if !child.is_leaf {
            let grandchild = sibling.children.remove(0);
            child.children.push(grandchild);
        }
        debug!(idx, "borrowed from next b-tree sibling");
    }

    /// Fold `keys[idx]` and `children[idx + 1]` into `children[idx]`.
    ///
    /// The absorbed sibling is dropped; its keys and children now belong to
    /// `children[idx]`.
    fn merge(&mut self, idx: usize) {
        let sibling = self.children.remove(idx + 1);
        let separator = self.keys.remove(idx);

        let child = &mut self.children[idx];
        child.keys.push(separator);

        let BTreeNode { keys, children, .. } = *sibling;
        child.keys.extend(keys);
        child.children.extend(children);
        debug!(idx, "merged b-tree children");
    }

    /// Append this subtree's keys in order
    pub(super) fn collect_keys(&self, out: &mut Vec<K>) {
        if self.is_leaf {
            out.extend(self.keys.iter().cloned());
            return;
        }
        for (i, child) in self.children.iter().enumerate() {
            child.collect_keys(out);
            if let Some(key) = self.keys.get(i) {
                out.push(key.clone());
            }
        }
    }

    /// Verify ordering, occupancy and balance for this subtree
    pub(super) fn check(
        &self,
        config: TreeConfig,
        depth: usize,
        bounds: (Option<&K>, Option<&K>),
        walk: &mut CheckWalk,
    ) -> Result<()> {
        let is_root = depth == 0;
        let len = self.keys.len();
        let (min_keys, max_keys) = (config.btree_min_keys(), config.btree_max_keys());

        if len > max_keys {
            return Err(TreeError::corruption(format!(
                "b-tree node at depth {} holds {} keys (max {})",
                depth, len, max_keys
            )));
        }
        if is_root && len == 0 {
            return Err(TreeError::corruption("b-tree root holds no keys"));
        }
        if !is_root && len < min_keys {
            return Err(TreeError::corruption(format!(
                "b-tree node at depth {} holds {} keys (min {})",
                depth, len, min_keys
            )));
        }
        if self.keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(TreeError::corruption(format!(
                "b-tree node at depth {} has unordered keys",
                depth
            )));
        }

        let (lower, upper) = bounds;
        let out_of_range = self.keys.iter().any(|key| {
            lower.is_some_and(|low| key <= low) || upper.is_some_and(|high| key >= high)
        });
        if out_of_range {
            return Err(TreeError::corruption(format!(
                "b-tree node at depth {} has a key outside its separators",
                depth
            )));
        }

        walk.keys += len;

        if self.is_leaf {
            if !self.children.is_empty() {
                return Err(TreeError::corruption("b-tree leaf owns children"));
            }
            match walk.leaf_depth {
                None => walk.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(TreeError::corruption(format!(
                        "b-tree leaves at depths {} and {}",
                        expected, depth
                    )));
                }
                Some(_) => {}
            }
            return Ok(());
        }

        if self.children.len() != len + 1 {
            return Err(TreeError::corruption(format!(
                "b-tree internal node with {} keys owns {} children",
                len,
                self.children.len()
            )));
        }

        for (i, child) in self.children.iter().enumerate() {
            let low = if i == 0 { lower } else { self.keys.get(i - 1) };
            let high = if i == len { upper } else { self.keys.get(i) };
            child.check(config, depth + 1, (low, high), walk)?;
        }
        Ok(())
    }
}

/// Running state of an invariant check
#[derive(Debug, Default)]
pub(super) struct CheckWalk {
    pub(super) leaf_depth: Option<usize>,
    pub(super) keys: usize,
}
