//! Wiring-graph resolution for the Tapestry runtime.
//!
//! This crate owns the dependency-ordering problem: given a set of plugin
//! instances and their wiring edges, produce a total start order in which
//! every provider precedes its consumers, or a cycle diagnostic naming the
//! full offending path. It is deliberately standalone — nodes are plain
//! `{id, type id, isolation flag, edges}` records, so the crate has no view
//! of schemas, services, or channels.
//!
//! # Core types
//!
//! - [`WiringGraph`] — the insertion-ordered node store
//! - [`Node`] / [`Edge`] — one instance and one wiring entry
//! - [`WiringGraph::resolve`] — deterministic topological ordering
//! - [`WiringGraph::mermaid`] — diagnostic diagram rendering
//!
//! # Example
//!
//! ```
//! use tapestry_graph::{Node, WiringGraph};
//!
//! let mut graph = WiringGraph::new();
//! graph.add_node(Node::new("sys-logger", "L")).expect("add logger");
//! graph.add_node(Node::new("db", "D").with_edge("logger", "sys-logger")).expect("add db");
//!
//! let order = graph.resolve().expect("acyclic");
//! assert_eq!(order, ["sys-logger", "db"]);
//! ```

mod diagram;
mod error;
mod graph;
mod resolver;

pub use error::GraphError;
pub use graph::{Edge, Node, WiringGraph};

#[cfg(test)]
mod tests;
