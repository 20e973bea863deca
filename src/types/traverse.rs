//! Printable lines of a top-down tree traversal.

use std::fmt;

/// One node of a pre-order traversal
///
/// Displays as the node's keys indented two spaces per level, with leaves
/// tagged, e.g. `  [4, 5, 6] (leaf)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraverseLine<'a, K> {
    /// Distance from the root
    pub depth: usize,
    /// Keys stored in the node
    pub keys: &'a [K],
    /// Whether the node is a leaf
    pub is_leaf: bool,
}

impl<K: fmt::Display> fmt::Display for TraverseLine<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("  ")?;
        }
        f.write_str("[")?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", key)?;
        }
        f.write_str("]")?;
        if self.is_leaf {
            f.write_str(" (leaf)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traverse_line_display() {
        let keys = [4, 5, 6];
        let line = TraverseLine {
            depth: 1,
            keys: &keys,
            is_leaf: true,
        };
        assert_eq!(line.to_string(), "  [4, 5, 6] (leaf)");

        let root = TraverseLine::<i32> {
            depth: 0,
            keys: &[],
            is_leaf: false,
        };
        assert_eq!(root.to_string(), "[]");
    }
}
