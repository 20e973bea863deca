//! Slot arena owning every node of a B+-tree.
//!
//! Nodes refer to each other by [`NodeId`]. Released slots go on a free
//! list and are reused by the next allocation, so an id is only valid
//! while its node is part of the tree.
//!
//! A lookup of a released slot means the tree's links are broken; it
//! panics rather than returning an error, since no rebalancing step can
//! continue from there.

use super::node::{BPlusNode, InternalNode, LeafNode};
use crate::types::NodeId;

/// Owner of all nodes in one B+-tree
#[derive(Debug)]
pub(super) struct NodeArena<K> {
    /// Node slots (None means released)
    slots: Vec<Option<BPlusNode<K>>>,
    /// Released slot indices
    free_slots: Vec<usize>,
    /// Number of occupied slots
    live: usize,
}

impl<K> NodeArena<K> {
    pub(super) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            live: 0,
        }
    }

    /// Number of nodes currently allocated
    pub(super) fn live(&self) -> usize {
        self.live
    }

    /// Store a node and return its id
    pub(super) fn alloc(&mut self, node: BPlusNode<K>) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free_slots.pop() {
            self.slots[index] = Some(node);
            NodeId::new(index)
        } else {
            self.slots.push(Some(node));
            NodeId::new(self.slots.len() - 1)
        }
    }

    /// Remove a node from the arena, handing it back to the caller
    pub(super) fn release(&mut self, id: NodeId) -> BPlusNode<K> {
        match self.slots.get_mut(id.index()).and_then(Option::take) {
            Some(node) => {
                self.live -= 1;
                self.free_slots.push(id.index());
                node
            }
            None => panic!("releasing unallocated b+ tree node {}", id),
        }
    }

    /// Drop every node
    pub(super) fn clear(&mut self) {
        self.slots.clear();
        self.free_slots.clear();
        self.live = 0;
    }

    /// Look up a node that may have been released
    pub(super) fn try_get(&self, id: NodeId) -> Option<&BPlusNode<K>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub(super) fn get(&self, id: NodeId) -> &BPlusNode<K> {
        match self.slots.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("b+ tree node {} is not allocated", id),
        }
    }

    pub(super) fn get_mut(&mut self, id: NodeId) -> &mut BPlusNode<K> {
        match self.slots.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("b+ tree node {} is not allocated", id),
        }
    }

    pub(super) fn leaf(&self, id: NodeId) -> &LeafNode<K> {
        match self.get(id) {
            BPlusNode::Leaf(leaf) => leaf,
            BPlusNode::Internal(_) => panic!("b+ tree node {} is not a leaf", id),
        }
    }

    pub(super) fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode<K> {
        match self.get_mut(id) {
            BPlusNode::Leaf(leaf) => leaf,
            BPlusNode::Internal(_) => panic!("b+ tree node {} is not a leaf", id),
        }
    }

    pub(super) fn internal(&self, id: NodeId) -> &InternalNode<K> {
        match self.get(id) {
            BPlusNode::Internal(node) => node,
            BPlusNode::Leaf(_) => panic!("b+ tree node {} is not internal", id),
        }
    }

    pub(super) fn internal_mut(&mut self, id: NodeId) -> &mut InternalNode<K> {
        match self.get_mut(id) {
            BPlusNode::Internal(node) => node,
            BPlusNode::Leaf(_) => panic!("b+ tree node {} is not internal", id),
        }
    }

    /// Point each listed node's parent link at `parent`
    pub(super) fn adopt(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.get_mut(child).set_parent(Some(parent));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bplus::node::KeySequence;

    fn leaf(keys: &[i32]) -> BPlusNode<i32> {
        BPlusNode::Leaf(LeafNode::new(keys.to_vec()))
    }

    #[test]
    fn test_alloc_and_get() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(leaf(&[1]));
        let b = arena.alloc(leaf(&[2]));
        assert_ne!(a, b);
        assert_eq!(arena.live(), 2);
        assert_eq!(arena.get(b).keys(), &[2]);
    }

    #[test]
    fn test_release_reuses_slot() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(leaf(&[1]));
        let _b = arena.alloc(leaf(&[2]));

        let released = arena.release(a);
        assert_eq!(released.keys(), &[1]);
        assert_eq!(arena.live(), 1);
        assert!(arena.try_get(a).is_none());

        let c = arena.alloc(leaf(&[3]));
        assert_eq!(c, a);
        assert_eq!(arena.get(c).keys(), &[3]);
    }

    #[test]
    #[should_panic(expected = "not allocated")]
    fn test_get_released_panics() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(leaf(&[1]));
        arena.release(a);
        arena.get(a);
    }

    #[test]
    fn test_adopt_sets_parent_links() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(leaf(&[1]));
        let b = arena.alloc(leaf(&[2]));
        let parent = arena.alloc(BPlusNode::Internal(InternalNode::new(vec![1, 2], vec![a, b])));

        arena.adopt(parent, &[a, b]);
        assert_eq!(arena.get(a).parent(), Some(parent));
        assert_eq!(arena.get(b).parent(), Some(parent));
        assert_eq!(arena.internal(parent).children(), &[a, b]);
    }

    #[test]
    fn test_clear() {
        let mut arena = NodeArena::new();
        arena.alloc(leaf(&[1]));
        arena.clear();
        assert_eq!(arena.live(), 0);
    }
}
