//! B+-tree node variants.
//!
//! A node is either a leaf, holding stored keys and its leaf-chain links,
//! or an internal node, holding one routing key per child. A routing key
//! is a copy of the largest key in the matching child's subtree.
//!
//! Parent, `prev` and `next` links are [`NodeId`]s into the tree's arena.
//! They are lookups only; the arena owns every node.

use crate::types::NodeId;

/// Read access to the ordered keys every node variant carries
pub trait KeySequence<K> {
    /// Keys in increasing order
    fn keys(&self) -> &[K];

    /// Number of keys
    fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether the node holds no keys
    fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Largest key, if any
    fn max_key(&self) -> Option<&K> {
        self.keys().last()
    }

    /// Index of the first key `>= key`, or `len()` if there is none
    fn find_key(&self, key: &K) -> usize
    where
        K: Ord,
    {
        self.keys().partition_point(|k| k < key)
    }
}

/// A leaf in the sorted, doubly-linked leaf chain
#[derive(Debug, Clone)]
pub struct LeafNode<K> {
    pub(super) keys: Vec<K>,
    pub(super) parent: Option<NodeId>,
    pub(super) prev: Option<NodeId>,
    pub(super) next: Option<NodeId>,
}

impl<K> LeafNode<K> {
    pub(super) fn new(keys: Vec<K>) -> Self {
        Self {
            keys,
            parent: None,
            prev: None,
            next: None,
        }
    }

    /// Parent node, if this leaf is not the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Left neighbor in the leaf chain
    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    /// Right neighbor in the leaf chain
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }
}

impl<K: Ord> LeafNode<K> {
    /// Check if the leaf stores `key`
    pub fn contains(&self, key: &K) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    /// Insert `key` at its sorted position
    pub(super) fn insert(&mut self, key: K) {
        let idx = self.find_key(&key);
        self.keys.insert(idx, key);
    }

    /// Erase `key`, reporting whether it was present
    pub(super) fn remove(&mut self, key: &K) -> bool {
        match self.keys.binary_search(key) {
            Ok(idx) => {
                self.keys.remove(idx);
                true
            }
            Err(_) => false,
        }
    }
}

impl<K> KeySequence<K> for LeafNode<K> {
    fn keys(&self) -> &[K] {
        &self.keys
    }
}

/// An internal node: `keys[i]` is the largest key under `children[i]`
#[derive(Debug, Clone)]
pub struct InternalNode<K> {
    pub(super) keys: Vec<K>,
    pub(super) children: Vec<NodeId>,
    pub(super) parent: Option<NodeId>,
}

impl<K> InternalNode<K> {
    pub(super) fn new(keys: Vec<K>, children: Vec<NodeId>) -> Self {
        Self {
            keys,
            children,
            parent: None,
        }
    }

    /// Child nodes, left to right
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent node, if this node is not the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

impl<K> KeySequence<K> for InternalNode<K> {
    fn keys(&self) -> &[K] {
        &self.keys
    }
}

/// A B+-tree node
#[derive(Debug, Clone)]
pub enum BPlusNode<K> {
    Leaf(LeafNode<K>),
    Internal(InternalNode<K>),
}

impl<K> BPlusNode<K> {
    /// Whether this node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Parent node, if this node is not the root
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Self::Leaf(leaf) => leaf.parent,
            Self::Internal(node) => node.parent,
        }
    }

    pub(super) fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Self::Leaf(leaf) => leaf.parent = parent,
            Self::Internal(node) => node.parent = parent,
        }
    }

    /// Child nodes, left to right (empty for a leaf)
    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Leaf(_) => &[],
            Self::Internal(node) => &node.children,
        }
    }

    /// Get the leaf variant
    pub fn as_leaf(&self) -> Option<&LeafNode<K>> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Internal(_) => None,
        }
    }

    /// Get the internal variant
    pub fn as_internal(&self) -> Option<&InternalNode<K>> {
        match self {
            Self::Leaf(_) => None,
            Self::Internal(node) => Some(node),
        }
    }

    /// Take the first key, and for an internal node its first child
    pub(super) fn pop_first(&mut self) -> Option<(K, Option<NodeId>)> {
        match self {
            Self::Leaf(leaf) if !leaf.keys.is_empty() => Some((leaf.keys.remove(0), None)),
            Self::Internal(node) if !node.keys.is_empty() => {
                Some((node.keys.remove(0), Some(node.children.remove(0))))
            }
            _ => None,
        }
    }

    /// Take the last key, and for an internal node its last child
    pub(super) fn pop_last(&mut self) -> Option<(K, Option<NodeId>)> {
        match self {
            Self::Leaf(leaf) => leaf.keys.pop().map(|key| (key, None)),
            Self::Internal(node) => {
                let key = node.keys.pop()?;
                Some((key, node.children.pop()))
            }
        }
    }

    /// Prepend a key, and for an internal node the child it routes to
    pub(super) fn push_first(&mut self, key: K, child: Option<NodeId>) {
        match self {
            Self::Leaf(leaf) => leaf.keys.insert(0, key),
            Self::Internal(node) => {
                node.keys.insert(0, key);
                if let Some(child) = child {
                    node.children.insert(0, child);
                }
            }
        }
    }

    /// Append a key, and for an internal node the child it routes to
    pub(super) fn push_last(&mut self, key: K, child: Option<NodeId>) {
        match self {
            Self::Leaf(leaf) => leaf.keys.push(key),
            Self::Internal(node) => {
                node.keys.push(key);
                if let Some(child) = child {
                    node.children.push(child);
                }
            }
        }
    }
}

impl<K> KeySequence<K> for BPlusNode<K> {
    fn keys(&self) -> &[K] {
        match self {
            Self::Leaf(leaf) => &leaf.keys,
            Self::Internal(node) => &node.keys,
        }
    }
}
