//! Deterministic topological ordering with cycle diagnostics.
//!
//! Depth-first post-order traversal with three-colour marking. Roots are
//! taken in node insertion order and edges in wiring order, so the output is
//! byte-identical for identical inputs. A back-edge to an on-stack node is a
//! cycle; the ancestor path on the stack yields the diagnostic at no extra
//! cost. Runs in `O(nodes + edges)`.

use crate::error::GraphError;
use crate::graph::WiringGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    Unvisited,
    OnStack,
    Done,
}

impl WiringGraph {
    /// Computes a total order over node ids in which every provider precedes
    /// its consumers.
    ///
    /// Edges whose target is not a known node are skipped: they refer to
    /// externally supplied services and impose no ordering.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicDependency`] carrying the full cycle path
    /// when the wiring is not a DAG. A self-edge is a cycle.
    pub fn resolve(&self) -> Result<Vec<String>, GraphError> {
        let mut colours = vec![Colour::Unvisited; self.node_count()];
        let mut order = Vec::with_capacity(self.node_count());
        let mut ancestors: Vec<usize> = Vec::new();

        for root in 0..self.node_count() {
            if colours[root] == Colour::Unvisited {
                self.visit(root, &mut colours, &mut order, &mut ancestors)?;
            }
        }
        Ok(order)
    }

    /// Iterative DFS from `root`, appending finished nodes post-order.
    fn visit(
        &self,
        root: usize,
        colours: &mut [Colour],
        order: &mut Vec<String>,
        ancestors: &mut Vec<usize>,
    ) -> Result<(), GraphError> {
        // Each frame is (node position, next edge index to examine).
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        colours[root] = Colour::OnStack;
        ancestors.push(root);

        while let Some(frame) = frames.last_mut() {
            let at = frame.0;
            let node = self.node_at(at);

            if let Some(edge) = node.edges().get(frame.1) {
                frame.1 += 1;
                let Some(target) = self.position(edge.target()) else {
                    // External target: treated as a leaf.
                    continue;
                };
                match colours[target] {
                    Colour::Done => {}
                    Colour::Unvisited => {
                        colours[target] = Colour::OnStack;
                        ancestors.push(target);
                        frames.push((target, 0));
                    }
                    Colour::OnStack => {
                        return Err(GraphError::cyclic(self.cycle_path(ancestors, target)));
                    }
                }
            } else {
                colours[at] = Colour::Done;
                order.push(node.id().to_owned());
                ancestors.pop();
                frames.pop();
            }
        }
        Ok(())
    }

    /// Renders the ancestor chain from the first occurrence of `target`
    /// back to `target`, e.g. `x -> y -> x`.
    fn cycle_path(&self, ancestors: &[usize], target: usize) -> String {
        let start = ancestors
            .iter()
            .position(|&at| at == target)
            .unwrap_or_default();
        let mut ids: Vec<&str> = ancestors[start..]
            .iter()
            .map(|&at| self.node_at(at).id())
            .collect();
        ids.push(self.node_at(target).id());
        ids.join(" -> ")
    }
}
