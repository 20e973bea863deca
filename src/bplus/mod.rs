//! B+-tree implementation.
//!
//! Stored keys live only in the leaves, which form a doubly-linked chain in
//! key order. Internal nodes hold one routing key per child, a copy of that
//! child's maximum. Supports:
//! - Point lookups (search)
//! - Insertions with split-on-overflow
//! - Deletions with borrow/merge repair after return
//! - Pre-order traversal and leaf-chain walks in both directions

mod arena;
mod cursor;
mod node;
mod rebalance;
mod tree;

pub use cursor::{Leaves, Traverse};
pub use node::{BPlusNode, InternalNode, KeySequence, LeafNode};
pub use tree::BPlusTree;
