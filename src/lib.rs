//! # BTree Index
//!
//! In-memory ordered indexes over unique keys, in two flavors:
//!
//! - **B-Tree** (`btree`): keys in every node, preemptive split on insert
//!   and borrow/merge repair before descending on remove
//! - **B+-Tree** (`bplus`): keys only in a doubly-linked leaf chain,
//!   internal nodes route by child maximum, repair after returning
//!
//! Both are parameterized by a minimum degree `t` (see [`TreeConfig`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use btree_index::{BPlusTree, BTree, Removal};
//!
//! let mut btree = BTree::new(10)?;
//! for key in 1..=100 {
//!     btree.insert(key);
//! }
//! assert!(btree.search(&6).is_some());
//! assert_eq!(btree.remove(&6), Removal::Removed);
//!
//! let mut bplus = BPlusTree::new(4)?;
//! for key in 1..=100 {
//!     bplus.insert(key);
//! }
//! for line in bplus.traverse() {
//!     println!("{}", line);
//! }
//! // Keys in order, read off the leaf chain
//! let keys = bplus.traverse_leaves();
//! ```

pub mod bplus;
pub mod btree;
pub mod error;
pub mod types;

pub use error::{Result, TreeError};
pub use types::{NodeId, Removal, TraverseLine, TreeConfig};

// Re-export main public API
pub use bplus::{BPlusNode, BPlusTree, InternalNode, KeySequence, LeafNode};
pub use btree::{BTree, BTreeNode};

use serde::{Deserialize, Serialize};

/// Tree node for visualization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode<K> {
    pub is_leaf: bool,
    pub keys: Vec<K>,
    pub children: Vec<TreeNode<K>>,
}

impl<K> TreeNode<K> {
    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}
