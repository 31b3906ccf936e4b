//! Error types for graph operations.

use thiserror::Error;

/// Errors returned by wiring-graph operations.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    /// The wiring contains a dependency cycle.
    ///
    /// `path` is the full ancestor chain `a0 -> a1 -> … -> a0`, closing on
    /// the node where the back-edge was found.
    #[error("cyclic dependency detected: {path}")]
    CyclicDependency {
        /// The rendered cycle path.
        path: String,
    },

    /// A node with the same id is already present in the graph.
    #[error("node '{0}' is already present in the graph")]
    DuplicateNode(String),
}

impl GraphError {
    /// Creates a `CyclicDependency` error.
    #[must_use]
    pub fn cyclic(path: impl Into<String>) -> Self {
        Self::CyclicDependency { path: path.into() }
    }

    /// Creates a `DuplicateNode` error.
    #[must_use]
    pub fn duplicate_node(id: impl Into<String>) -> Self {
        Self::DuplicateNode(id.into())
    }
}
