//! Node identifier type.

use std::fmt;

/// Slot index of a B+-tree node inside its tree's node arena.
///
/// Parent links and leaf-chain links are stored as `NodeId`s. They never keep
/// a node alive: only the tree's arena owns nodes, and an id is meaningless
/// once its slot is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a new node ID
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the arena slot index
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}
