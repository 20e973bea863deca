//! B-tree implementation.
//!
//! Keys live in every node, internal nodes included. Supports:
//! - Point lookups (search)
//! - Insertions with preemptive splitting
//! - Deletions with borrow/merge repair before descent
//! - Pre-order traversal for debugging

mod cursor;
mod node;
mod tree;

pub use cursor::Traverse;
pub use node::BTreeNode;
pub use tree::BTree;
