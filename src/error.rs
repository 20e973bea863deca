//! Error types for the tree indexes.

use thiserror::Error;

/// Result type alias for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur when building or checking a tree
#[derive(Error, Debug)]
pub enum TreeError {
    /// Minimum degree below the smallest value the balancing rules support
    #[error("Invalid minimum degree {degree} (min: {min})")]
    InvalidDegree { degree: usize, min: usize },

    /// Key not found (for callers that want a missing key to be an error)
    #[error("Key not found")]
    KeyNotFound,

    /// The tree has no root
    #[error("Tree is empty")]
    EmptyTree,

    /// A structural invariant does not hold
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error while reading a configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TreeError {
    /// Create a corruption error with a message
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
