//! Crate-level tests for resolution and rendering.

use rstest::rstest;

use crate::{GraphError, Node, WiringGraph};

/// Builds the linear chain logger ← db ← api used across the suite.
fn chain_graph() -> WiringGraph {
    let mut graph = WiringGraph::new();
    graph
        .add_node(Node::new("sys-logger", "L"))
        .expect("add sys-logger");
    graph
        .add_node(Node::new("db", "D").with_edge("logger", "sys-logger"))
        .expect("add db");
    graph
        .add_node(
            Node::new("api", "A")
                .with_edge("logger", "sys-logger")
                .with_edge("db", "db"),
        )
        .expect("add api");
    graph
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[rstest]
fn providers_precede_consumers() {
    let order = chain_graph().resolve().expect("acyclic");
    assert_eq!(order, ["sys-logger", "db", "api"]);
}

#[rstest]
fn consumers_registered_first_still_follow_providers() {
    let mut graph = WiringGraph::new();
    graph
        .add_node(Node::new("api", "A").with_edge("db", "db"))
        .expect("add api");
    graph
        .add_node(Node::new("db", "D"))
        .expect("add db");

    let order = graph.resolve().expect("acyclic");
    assert_eq!(order, ["db", "api"]);
}

#[rstest]
fn diamond_orders_every_edge_consistently() {
    let mut graph = WiringGraph::new();
    graph.add_node(Node::new("base", "B")).expect("add base");
    graph
        .add_node(Node::new("left", "L").with_edge("dep", "base"))
        .expect("add left");
    graph
        .add_node(Node::new("right", "R").with_edge("dep", "base"))
        .expect("add right");
    graph
        .add_node(
            Node::new("top", "T")
                .with_edge("l", "left")
                .with_edge("r", "right"),
        )
        .expect("add top");

    let order = graph.resolve().expect("acyclic");
    let position = |id: &str| order.iter().position(|node| node == id).expect("present");
    assert!(position("base") < position("left"));
    assert!(position("base") < position("right"));
    assert!(position("left") < position("top"));
    assert!(position("right") < position("top"));
}

#[rstest]
fn identical_inputs_produce_identical_orders() {
    let first = chain_graph().resolve().expect("first run");
    let second = chain_graph().resolve().expect("second run");
    assert_eq!(first, second);
}

#[rstest]
fn external_targets_are_skipped() {
    let mut graph = WiringGraph::new();
    graph
        .add_node(Node::new("app", "A").with_edge("logger", "ext-logger"))
        .expect("add app");

    let order = graph.resolve().expect("acyclic");
    assert_eq!(order, ["app"]);
}

#[rstest]
fn nodes_without_requirements_are_leaves() {
    let mut graph = WiringGraph::new();
    graph.add_node(Node::new("leaf", "L")).expect("add leaf");
    graph
        .add_node(Node::new("consumer", "C").with_edge("dep", "leaf"))
        .expect("add consumer");

    let order = graph.resolve().expect("acyclic");
    assert_eq!(order.first().map(String::as_str), Some("leaf"));
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

#[rstest]
fn two_node_cycle_reports_full_path() {
    let mut graph = WiringGraph::new();
    graph
        .add_node(Node::new("x", "X").with_edge("a", "y"))
        .expect("add x");
    graph
        .add_node(Node::new("y", "Y").with_edge("b", "x"))
        .expect("add y");

    let err = graph.resolve().expect_err("cycle");
    let GraphError::CyclicDependency { path } = err else {
        panic!("expected cyclic dependency, got {err:?}");
    };
    assert_eq!(path, "x -> y -> x");
}

#[rstest]
fn self_edge_is_a_cycle() {
    let mut graph = WiringGraph::new();
    graph
        .add_node(Node::new("x", "X").with_edge("self", "x"))
        .expect("add x");

    let err = graph.resolve().expect_err("self cycle");
    assert!(err.to_string().contains("x -> x"));
}

#[rstest]
fn cycle_reached_through_a_prefix_excludes_the_prefix() {
    let mut graph = WiringGraph::new();
    graph
        .add_node(Node::new("entry", "E").with_edge("dep", "a"))
        .expect("add entry");
    graph
        .add_node(Node::new("a", "A").with_edge("dep", "b"))
        .expect("add a");
    graph
        .add_node(Node::new("b", "B").with_edge("dep", "a"))
        .expect("add b");

    let err = graph.resolve().expect_err("cycle");
    let GraphError::CyclicDependency { path } = err else {
        panic!("expected cyclic dependency, got {err:?}");
    };
    assert_eq!(path, "a -> b -> a");
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[rstest]
fn duplicate_node_is_rejected() {
    let mut graph = WiringGraph::new();
    graph.add_node(Node::new("app", "A")).expect("first add");
    let err = graph.add_node(Node::new("app", "A")).expect_err("duplicate");
    assert!(matches!(err, GraphError::DuplicateNode(id) if id == "app"));
}

// ---------------------------------------------------------------------------
// Diagram
// ---------------------------------------------------------------------------

#[rstest]
fn mermaid_renders_shapes_and_labels() {
    let mut graph = WiringGraph::new();
    graph
        .add_node(Node::new("sys-logger", "L"))
        .expect("add logger");
    graph
        .add_node(
            Node::new("db", "D")
                .isolated(true)
                .with_edge("logger", "sys-logger"),
        )
        .expect("add db");

    let diagram = graph.mermaid();
    assert!(diagram.starts_with("flowchart TD\n"));
    assert!(diagram.contains(r#"n0["sys-logger (L) [main]"]"#));
    assert!(diagram.contains(r#"n1{{"db (D) [worker]"}}"#));
    assert!(diagram.contains("n1 -->|logger| n0"));
    assert!(!diagram.contains("missing"));
}

#[rstest]
fn mermaid_collects_unknown_targets_into_one_sink() {
    let mut graph = WiringGraph::new();
    graph
        .add_node(Node::new("app", "A").with_edge("logger", "ext-logger"))
        .expect("add app");
    graph
        .add_node(Node::new("job", "J").with_edge("queue", "ext-queue"))
        .expect("add job");

    let diagram = graph.mermaid();
    assert_eq!(diagram.matches("missing((").count(), 1);
    assert!(diagram.contains("n0 -->|logger| missing"));
    assert!(diagram.contains("n1 -->|queue| missing"));
}
