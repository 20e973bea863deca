//! Recursive insert/remove and local rebalancing for B+-tree nodes.
//!
//! With minimum degree `t`, a node splits once it holds more than `2t`
//! keys, and a non-root node is refilled once it drops below `t` keys.
//! Both bounds come from [`TreeConfig`].
//! Repairs happen after returning from the child: routing keys are copies
//! of child maxima, so they can only be refreshed once the child has
//! settled.

use super::arena::NodeArena;
use super::node::{BPlusNode, InternalNode, KeySequence, LeafNode};
use crate::types::{NodeId, TreeConfig};
use std::mem;
use tracing::debug;

impl<K: Ord + Clone> NodeArena<K> {
    /// Insert `key` into the subtree rooted at `id`.
    ///
    /// The caller is responsible for splitting `id` itself if it overflows.
    pub(super) fn insert(&mut self, id: NodeId, key: K, config: TreeConfig) {
        let (idx, child) = match self.get_mut(id) {
            BPlusNode::Leaf(leaf) => {
                leaf.insert(key);
                return;
            }
            BPlusNode::Internal(node) => {
                let mut idx = node.find_key(&key);
                if idx == node.keys.len() {
                    // New maximum: it lands in the last child, whose
                    // routing key must follow.
                    idx -= 1;
                    node.keys[idx] = key.clone();
                }
                (idx, node.children[idx])
            }
        };

        self.insert(child, key, config);

        if self.get(child).len() > config.bplus_max_keys() {
            self.split_child(id, idx);
        }
    }

    /// Split the overflowing child at `idx` in half.
    ///
    /// The child keeps the lower half and a new right sibling takes the
    /// upper half. Both routing keys change: the child's slot gets its new,
    /// smaller maximum and the sibling's slot, inserted right after it, gets
    /// the old maximum.
    pub(super) fn split_child(&mut self, parent: NodeId, idx: usize) {
        let left_id = self.internal(parent).children[idx];

        let right = match self.get_mut(left_id) {
            BPlusNode::Leaf(left) => {
                let mid = left.keys.len() / 2;
                let mut right = LeafNode::new(left.keys.split_off(mid));
                right.prev = Some(left_id);
                right.next = left.next;
                BPlusNode::Leaf(right)
            }
            BPlusNode::Internal(left) => {
                let mid = left.keys.len() / 2;
                BPlusNode::Internal(InternalNode::new(
                    left.keys.split_off(mid),
                    left.children.split_off(mid),
                ))
            }
        };

        let (Some(left_max), Some(right_max)) = (
            self.get(left_id).max_key().cloned(),
            right.max_key().cloned(),
        ) else {
            unreachable!("splitting a b+ tree node with fewer than two keys");
        };
        let old_next = right.as_leaf().and_then(LeafNode::next);
        let moved = right.children().to_vec();

        let right_id = self.alloc(right);
        self.get_mut(right_id).set_parent(Some(parent));
        self.adopt(right_id, &moved);

        if self.get(left_id).is_leaf() {
            self.leaf_mut(left_id).next = Some(right_id);
            if let Some(next) = old_next {
                self.leaf_mut(next).prev = Some(right_id);
            }
        }

        let node = self.internal_mut(parent);
        node.keys[idx] = left_max;
        node.keys.insert(idx + 1, right_max);
        node.children.insert(idx + 1, right_id);
        debug!(idx, "split b+ tree child");
    }

    /// Remove `key` from the subtree rooted at `id`.
    ///
    /// Returns `false`, with nothing changed, if the key is not present.
    pub(super) fn remove(&mut self, id: NodeId, key: &K, config: TreeConfig) -> bool {
        let (idx, child) = match self.get_mut(id) {
            BPlusNode::Leaf(leaf) => return leaf.remove(key),
            BPlusNode::Internal(node) => {
                let idx = node.find_key(key);
                if idx == node.keys.len() {
                    return false;
                }
                (idx, node.children[idx])
            }
        };

        if !self.remove(child, key, config) {
            return false;
        }

        if let Some(max) = self.get(child).max_key().cloned() {
            self.internal_mut(id).keys[idx] = max;
        }
        if self.get(child).len() < config.bplus_min_keys() {
            self.fill(id, idx, config);
        }
        true
    }

    /// Bring the child at `idx` back up to the minimum key count.
    ///
    /// Borrows only from a sibling holding more than the minimum, left
    /// first. Otherwise merges into the left sibling when there is one, else
    /// absorbs the right sibling.
    fn fill(&mut self, parent: NodeId, idx: usize, config: TreeConfig) {
        let min_keys = config.bplus_min_keys();
        let children = &self.internal(parent).children;
        let prev = idx.checked_sub(1).map(|i| children[i]);
        let next = children.get(idx + 1).copied();

        let prev_surplus = prev.is_some_and(|id| self.get(id).len() > min_keys);
        let next_surplus = next.is_some_and(|id| self.get(id).len() > min_keys);

        if prev_surplus {
            self.borrow_from_prev(parent, idx);
        } else if next_surplus {
            self.borrow_from_next(parent, idx);
        } else if prev.is_some() {
            self.merge_prev(parent, idx);
        } else if next.is_some() {
            self.merge_next(parent, idx);
        } else {
            unreachable!("b+ tree child has no sibling to repair from");
        }
    }

    /// Move the left sibling's last key (and child) to the front of `children[idx]`
    fn borrow_from_prev(&mut self, parent: NodeId, idx: usize) {
        let (sibling, child) = {
            let node = self.internal(parent);
            (node.children[idx - 1], node.children[idx])
        };

        let Some((key, grandchild)) = self.get_mut(sibling).pop_last() else {
            unreachable!("borrowing from an empty b+ tree sibling");
        };
        self.get_mut(child).push_first(key, grandchild);
        if let Some(grandchild) = grandchild {
            self.get_mut(grandchild).set_parent(Some(child));
        }

        // The child's maximum is unchanged; the sibling's shrank
        if let Some(max) = self.get(sibling).max_key().cloned() {
            self.internal_mut(parent).keys[idx - 1] = max;
        }
        debug!(idx, "borrowed from previous b+ tree sibling");
    }

    /// Move the right sibling's first key (and child) to the end of `children[idx]`
    fn borrow_from_next(&mut self, parent: NodeId, idx: usize) {
        let (child, sibling) = {
            let node = self.internal(parent);
            (node.children[idx], node.children[idx + 1])
        };

        let Some((key, grandchild)) = self.get_mut(sibling).pop_first() else {
            unreachable!("borrowing from an empty b+ tree sibling");
        };
        self.get_mut(child).push_last(key, grandchild);
        if let Some(grandchild) = grandchild {
            self.get_mut(grandchild).set_parent(Some(child));
        }

        // The sibling's maximum is unchanged; the child's grew
        if let Some(max) = self.get(child).max_key().cloned() {
            self.internal_mut(parent).keys[idx] = max;
        }
        debug!(idx, "borrowed from next b+ tree sibling");
    }

    /// Fold the left sibling into `children[idx]` and release it
    fn merge_prev(&mut self, parent: NodeId, idx: usize) {
        let (sibling, child) = {
            let node = self.internal(parent);
            (node.children[idx - 1], node.children[idx])
        };

        let absorbed = self.release(sibling);
        {
            let node = self.internal_mut(parent);
            node.keys.remove(idx - 1);
            node.children.remove(idx - 1);
        }

        let relink = match absorbed {
            BPlusNode::Leaf(absorbed) => {
                let leaf = self.leaf_mut(child);
                let mut keys = absorbed.keys;
                keys.append(&mut leaf.keys);
                leaf.keys = keys;
                leaf.prev = absorbed.prev;
                absorbed.prev
            }
            BPlusNode::Internal(absorbed) => {
                let node = self.internal_mut(child);
                let mut keys = absorbed.keys;
                keys.append(&mut node.keys);
                node.keys = keys;
                let moved = absorbed.children;
                let mut children = moved.clone();
                children.append(&mut node.children);
                node.children = children;
                self.adopt(child, &moved);
                None
            }
        };

        if let Some(prev) = relink {
            self.leaf_mut(prev).next = Some(child);
        }
        debug!(idx, "merged b+ tree child into previous sibling");
    }

    /// Fold the right sibling into `children[idx]` and release it
    fn merge_next(&mut self, parent: NodeId, idx: usize) {
        let (child, sibling) = {
            let node = self.internal(parent);
            (node.children[idx], node.children[idx + 1])
        };

        let absorbed = self.release(sibling);
        {
            let node = self.internal_mut(parent);
            node.keys.remove(idx + 1);
            node.children.remove(idx + 1);
        }

        let relink = match absorbed {
            BPlusNode::Leaf(mut absorbed) => {
                let leaf = self.leaf_mut(child);
                leaf.keys.append(&mut absorbed.keys);
                leaf.next = absorbed.next;
                absorbed.next
            }
            BPlusNode::Internal(mut absorbed) => {
                let moved = mem::take(&mut absorbed.children);
                let node = self.internal_mut(child);
                node.keys.append(&mut absorbed.keys);
                node.children.extend_from_slice(&moved);
                self.adopt(child, &moved);
                None
            }
        };

        if let Some(next) = relink {
            self.leaf_mut(next).prev = Some(child);
        }
        if let Some(max) = self.get(child).max_key().cloned() {
            self.internal_mut(parent).keys[idx] = max;
        }
        debug!(idx, "merged next b+ tree sibling into child");
    }
}
