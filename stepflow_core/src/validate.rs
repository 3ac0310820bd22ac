//! Structural validation of a dependency graph.
//!
//! Produces a report of cycles and isolated steps without touching the
//! graph. Used after bulk loads, where edges skip the admission check.

use crate::graph::DependencyGraph;
use crate::types::StepId;
use petgraph::Direction;

/// Validation report for a dependency graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Whether the graph is valid (no cycles)
    is_valid: bool,
    /// Each cycle as its sorted member steps
    cycles: Vec<Vec<StepId>>,
    /// Steps with neither prerequisites nor dependents
    isolated_steps: Vec<StepId>,
}

impl ValidationReport {
    fn new() -> Self {
        Self {
            is_valid: true,
            cycles: Vec::new(),
            isolated_steps: Vec::new(),
        }
    }

    /// Returns whether the graph is valid.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Returns the cycles detected in the graph.
    pub fn cycles(&self) -> &[Vec<StepId>] {
        &self.cycles
    }

    /// Returns the isolated steps detected.
    pub fn isolated_steps(&self) -> &[StepId] {
        &self.isolated_steps
    }

    fn add_cycle(&mut self, cycle: Vec<StepId>) {
        self.is_valid = false;
        self.cycles.push(cycle);
    }

    fn add_isolated_step(&mut self, step: StepId) {
        // Isolated steps are warnings, not errors
        self.isolated_steps.push(step);
    }
}

/// Validator for dependency graph structure.
#[derive(Clone, Copy, Debug, Default)]
pub struct GraphValidator;

impl GraphValidator {
    /// Creates a new graph validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates the graph structure.
    ///
    /// Cycles are reported as strongly connected components with more
    /// than one step, sorted by their smallest member. Isolated steps are
    /// listed in identifier order. A graph with a single step is never
    /// reported as isolated.
    pub fn validate(&self, graph: &DependencyGraph) -> ValidationReport {
        let mut report = ValidationReport::new();

        self.check_cycles(graph, &mut report);
        if graph.step_count() > 1 {
            self.check_isolated_steps(graph, &mut report);
        }

        report
    }

    fn check_cycles(&self, graph: &DependencyGraph, report: &mut ValidationReport) {
        if graph.is_acyclic() {
            return;
        }

        let mut cycles: Vec<Vec<StepId>> = petgraph::algo::tarjan_scc(&graph.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut ids: Vec<StepId> = scc
                    .into_iter()
                    .map(|idx| graph.graph[idx].id.clone())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();

        for cycle in cycles {
            report.add_cycle(cycle);
        }
    }

    fn check_isolated_steps(&self, graph: &DependencyGraph, report: &mut ValidationReport) {
        let mut isolated: Vec<StepId> = graph
            .step_map
            .iter()
            .filter(|&(_, &idx)| {
                graph.graph.neighbors_directed(idx, Direction::Incoming).next().is_none()
                    && graph.graph.neighbors_directed(idx, Direction::Outgoing).next().is_none()
            })
            .map(|(id, _)| id.clone())
            .collect();
        isolated.sort();

        for step in isolated {
            report.add_isolated_step(step);
        }
    }
}
