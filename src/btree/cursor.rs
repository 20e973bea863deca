//! Top-down traversal of a B-tree.
//!
//! The traversal keeps a stack of (depth, node) pairs and yields nodes in
//! pre-order: a node first, then each of its subtrees left to right.

use super::node::BTreeNode;
use crate::types::TraverseLine;

/// Pre-order iterator over the nodes of a B-tree
pub struct Traverse<'a, K> {
    stack: Vec<(usize, &'a BTreeNode<K>)>,
}

impl<'a, K> Traverse<'a, K> {
    pub(super) fn new(root: Option<&'a BTreeNode<K>>) -> Self {
        Self {
            stack: root.map(|node| (0, node)).into_iter().collect(),
        }
    }
}

impl<'a, K> Iterator for Traverse<'a, K> {
    type Item = TraverseLine<'a, K>;

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        // Push right to left so the leftmost child is visited first
        for child in node.children.iter().rev() {
            self.stack.push((depth + 1, child.as_ref()));
        }
        Some(TraverseLine {
            depth,
            keys: node.keys(),
            is_leaf: node.is_leaf(),
        })
    }
}
