//! Common types shared by the B-tree and the B+-tree.

mod node_id;
mod traverse;

pub use node_id::NodeId;
pub use traverse::TraverseLine;

use crate::error::{Result, TreeError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest minimum degree the split and merge rules work with
pub const MIN_DEGREE: usize = 2;

/// Largest minimum degree accepted; a full node preallocates `2t` slots
pub const MAX_MIN_DEGREE: usize = 1 << 16;

/// Minimum degree used when a configuration does not name one
pub const DEFAULT_MIN_DEGREE: usize = 2;

/// Minimum degree of the B-tree in the demo driver
pub const DEMO_BTREE_DEGREE: usize = 10;

/// Minimum degree of the B+-tree in the demo driver
pub const DEMO_BPLUS_DEGREE: usize = 4;

/// Tree configuration
///
/// The same minimum degree `t` yields different occupancy windows for the two
/// structures: a B-tree node holds `t-1..=2t-1` keys, a B+-tree node holds
/// `t..=2t` keys. The root is exempt from the lower bound in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeConfig {
    /// Minimum degree `t`
    pub min_degree: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            min_degree: DEFAULT_MIN_DEGREE,
        }
    }
}

impl TreeConfig {
    /// Create a config with the given minimum degree
    pub fn new(min_degree: usize) -> Self {
        Self { min_degree }
    }

    /// Set the minimum degree
    pub fn min_degree(mut self, min_degree: usize) -> Self {
        self.min_degree = min_degree;
        self
    }

    /// Reject degrees the balancing rules cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.min_degree < MIN_DEGREE {
            return Err(TreeError::InvalidDegree {
                degree: self.min_degree,
                min: MIN_DEGREE,
            });
        }
        if self.min_degree > MAX_MIN_DEGREE {
            return Err(TreeError::config(format!(
                "minDegree {} exceeds the maximum of {}",
                self.min_degree, MAX_MIN_DEGREE
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON config such as `{"minDegree": 4}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// A full B-tree node holds this many keys
    pub fn btree_max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }

    /// Every non-root B-tree node holds at least this many keys
    pub fn btree_min_keys(&self) -> usize {
        self.min_degree - 1
    }

    /// A B+-tree node splits once it holds more than this many keys
    pub fn bplus_max_keys(&self) -> usize {
        2 * self.min_degree
    }

    /// Every non-root B+-tree node holds at least this many keys
    pub fn bplus_min_keys(&self) -> usize {
        self.min_degree
    }
}

/// Outcome of a `remove` call.
///
/// A missing key or an empty tree is reported, not raised: the tree is left
/// in a valid state and the caller carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The key was present and is gone now
    Removed,
    /// The key does not exist in the tree
    KeyNotFound,
    /// The tree has no root
    EmptyTree,
}

impl Removal {
    /// Check if the key was actually removed
    pub fn is_removed(self) -> bool {
        matches!(self, Self::Removed)
    }

    /// Turn the soft outcomes into errors
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Removed => Ok(()),
            Self::KeyNotFound => Err(TreeError::KeyNotFound),
            Self::EmptyTree => Err(TreeError::EmptyTree),
        }
    }
}
