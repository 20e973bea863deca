//! Cursors over a B+-tree: a top-down node traversal and the leaf chain.

use super::arena::NodeArena;
use super::node::KeySequence;
use crate::types::{NodeId, TraverseLine};

/// Pre-order iterator over the nodes of a B+-tree
pub struct Traverse<'a, K> {
    arena: &'a NodeArena<K>,
    /// Stack of (depth, node) still to visit
    stack: Vec<(usize, NodeId)>,
}

impl<'a, K> Traverse<'a, K> {
    pub(super) fn new(arena: &'a NodeArena<K>, root: Option<NodeId>) -> Self {
        Self {
            arena,
            stack: root.map(|id| (0, id)).into_iter().collect(),
        }
    }
}

impl<'a, K> Iterator for Traverse<'a, K> {
    type Item = TraverseLine<'a, K>;

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        let node = self.arena.get(id);
        for &child in node.children().iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some(TraverseLine {
            depth,
            keys: node.keys(),
            is_leaf: node.is_leaf(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// Iterator over the leaf chain, yielding each leaf's keys.
///
/// Follows `next` links from the leftmost leaf, or `prev` links from the
/// rightmost leaf when walking backward. Internal nodes are never visited.
pub struct Leaves<'a, K> {
    arena: &'a NodeArena<K>,
    cursor: Option<NodeId>,
    direction: Direction,
}

impl<'a, K> Leaves<'a, K> {
    pub(super) fn forward(arena: &'a NodeArena<K>, first: Option<NodeId>) -> Self {
        Self {
            arena,
            cursor: first,
            direction: Direction::Forward,
        }
    }

    pub(super) fn backward(arena: &'a NodeArena<K>, last: Option<NodeId>) -> Self {
        Self {
            arena,
            cursor: last,
            direction: Direction::Backward,
        }
    }
}

impl<'a, K> Iterator for Leaves<'a, K> {
    type Item = &'a [K];

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let leaf = self.arena.leaf(id);
        self.cursor = match self.direction {
            Direction::Forward => leaf.next,
            Direction::Backward => leaf.prev,
        };
        Some(leaf.keys())
    }
}
