//! Mermaid diagram rendering for wiring graphs.
//!
//! The output is informational only: one node per instance labelled
//! `id (type_id) [mode]` — hexagons for isolated nodes, rectangles for the
//! rest — one labelled edge per wiring entry, and a single shared sink for
//! targets that are not registered instances.

use std::fmt::Write as _;

use crate::graph::WiringGraph;

/// Handle used for the shared sink node collecting unknown targets.
const MISSING_SINK: &str = "missing";

impl WiringGraph {
    /// Renders the graph as a Mermaid `flowchart TD` diagram.
    #[must_use]
    pub fn mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");

        for (position, node) in self.nodes().enumerate() {
            let mode = if node.is_isolated() { "worker" } else { "main" };
            let label = format!("{} ({}) [{}]", node.id(), node.type_id(), mode);
            if node.is_isolated() {
                let _ = writeln!(out, "    n{position}{{{{\"{label}\"}}}}");
            } else {
                let _ = writeln!(out, "    n{position}[\"{label}\"]");
            }
        }

        let any_missing = self
            .nodes()
            .flat_map(|node| node.edges())
            .any(|edge| !self.contains_node(edge.target()));
        if any_missing {
            let _ = writeln!(out, "    {MISSING_SINK}((\"missing\"))");
        }

        for (position, node) in self.nodes().enumerate() {
            for edge in node.edges() {
                let target = match self.position(edge.target()) {
                    Some(target_position) => format!("n{target_position}"),
                    None => MISSING_SINK.to_owned(),
                };
                let _ = writeln!(out, "    n{position} -->|{}| {target}", edge.requirement());
            }
        }

        out
    }
}
