//! Integration tests for admission rules and execution ordering.

use stepflow_core::{Dependency, DependencyGraph, GraphError, Step, StepId};

fn ids(raw: &[&str]) -> Vec<StepId> {
    raw.iter().map(|id| StepId::new(*id)).collect()
}

fn position(order: &[StepId], id: &StepId) -> usize {
    order.iter().position(|step| step == id).unwrap()
}

#[test]
fn test_duplicate_step_scoped_to_workflow() {
    let mut first = DependencyGraph::new();
    let mut second = DependencyGraph::new();

    first.add_step("s", "in first").unwrap();
    assert_eq!(
        first.add_step("s", "again"),
        Err(GraphError::DuplicateStep(StepId::new("s")))
    );

    // Same identifier in another workflow is fine
    second.add_step("s", "in second").unwrap();
    assert_eq!(second.step_count(), 1);
}

#[test]
fn test_self_dependency_always_rejected() {
    let mut graph = DependencyGraph::new();
    for id in ["a", "b", "c"] {
        graph.add_step(id, "").unwrap();
    }
    graph.add_dependency("b", "a").unwrap();

    for id in ["a", "b", "c"] {
        assert_eq!(
            graph.add_dependency(id, id),
            Err(GraphError::SelfDependency(StepId::new(id)))
        );
    }
    assert_eq!(graph.dependency_count(), 1);
}

#[test]
fn test_unknown_step_on_either_side() {
    let mut graph = DependencyGraph::new();
    graph.add_step("known", "").unwrap();

    let left = graph.add_dependency("ghost", "known").unwrap_err();
    let right = graph.add_dependency("known", "ghost").unwrap_err();

    assert_eq!(left, GraphError::UnknownStep(StepId::new("ghost")));
    assert_eq!(right, GraphError::UnknownStep(StepId::new("ghost")));
    assert_eq!(graph.dependency_count(), 0);
}

#[test]
fn test_closing_chain_is_rejected_without_mutation() {
    let mut graph = DependencyGraph::new();
    for id in ["A", "B", "C"] {
        graph.add_step(id, "").unwrap();
    }
    graph.add_dependency("B", "A").unwrap();
    graph.add_dependency("C", "B").unwrap();
    let before = graph.dependencies();

    let err = graph.add_dependency("A", "C").unwrap_err();

    assert!(matches!(err, GraphError::CyclicDependency { .. }));
    assert_eq!(err.steps(), ids(&["A", "B", "C", "A"]));
    assert_eq!(graph.dependency_count(), 2);
    assert_eq!(graph.dependencies(), before);
}

#[test]
fn test_every_prerequisite_precedes_its_dependent() {
    let mut graph = DependencyGraph::new();
    let steps = ["fetch", "lint", "build", "test", "package", "deploy", "docs"];
    for id in steps {
        graph.add_step(id, "").unwrap();
    }
    let edges = [
        ("lint", "fetch"),
        ("build", "fetch"),
        ("test", "build"),
        ("test", "lint"),
        ("package", "test"),
        ("deploy", "package"),
        ("docs", "build"),
    ];
    for (step, prerequisite) in edges {
        graph.add_dependency(step, prerequisite).unwrap();
    }

    let order = graph.compute_execution_order().unwrap();
    assert_eq!(order.len(), steps.len());

    for dependency in graph.dependencies() {
        assert!(
            position(&order, &dependency.prerequisite_id) < position(&order, &dependency.step_id),
            "{} must precede {}",
            dependency.prerequisite_id,
            dependency.step_id
        );
    }
}

#[test]
fn test_order_is_deterministic() {
    let mut graph = DependencyGraph::new();
    for id in ["m", "k", "z", "a", "q"] {
        graph.add_step(id, "").unwrap();
    }
    graph.add_dependency("z", "m").unwrap();
    graph.add_dependency("a", "q").unwrap();

    let first = graph.compute_execution_order().unwrap();
    let second = graph.compute_execution_order().unwrap();

    assert_eq!(first, second);
    assert_eq!(first, ids(&["k", "m", "q", "a", "z"]));
}

#[test]
fn test_scenario_abc() {
    let mut graph = DependencyGraph::new();
    for id in ["A", "B", "C"] {
        graph.add_step(id, "").unwrap();
    }
    graph.add_dependency("B", "A").unwrap();
    graph.add_dependency("C", "A").unwrap();
    graph.add_dependency("C", "B").unwrap();

    assert_eq!(graph.compute_execution_order().unwrap(), ids(&["A", "B", "C"]));
}

#[test]
fn test_scenario_rejected_back_edge_keeps_order() {
    let mut graph = DependencyGraph::new();
    graph.add_step("X", "").unwrap();
    graph.add_step("Y", "").unwrap();
    graph.add_dependency("Y", "X").unwrap();

    let result = graph.add_dependency("X", "Y");

    assert!(matches!(result, Err(GraphError::CyclicDependency { .. })));
    assert_eq!(graph.compute_execution_order().unwrap(), ids(&["X", "Y"]));
}

#[test]
fn test_scenario_empty_workflow() {
    let graph = DependencyGraph::new();
    assert_eq!(graph.compute_execution_order(), Ok(Vec::new()));
}

#[test]
fn test_scenario_single_step() {
    let mut graph = DependencyGraph::new();
    graph.add_step("solo", "").unwrap();
    assert_eq!(graph.compute_execution_order().unwrap(), ids(&["solo"]));
}

#[test]
fn test_ordering_catches_cycles_that_bypassed_admission() {
    let graph = DependencyGraph::load(
        ["a", "b", "c", "d"].map(|id| Step::new(id, "")),
        vec![
            Dependency::new("b", "a"),
            Dependency::new("c", "b"),
            Dependency::new("b", "c"),
            Dependency::new("d", "a"),
        ],
    )
    .unwrap();

    let err = graph.compute_execution_order().unwrap_err();

    assert!(err.is_invariant_violation());
    assert_eq!(err, GraphError::CycleDetected(ids(&["b", "c"])));
    // Repeated queries reproduce the same error
    assert_eq!(graph.compute_execution_order().unwrap_err(), err);
}
