//! Dependency graph for the steps of a single workflow.
//!
//! Steps are nodes of a petgraph `DiGraph`; an edge runs from a
//! prerequisite to the step that depends on it. Admission of a new
//! edge is checked for cycles, and the execution order query checks
//! again on its own so that graphs assembled through [`DependencyGraph::load`]
//! are handled correctly too.

use crate::error::{GraphError, Result};
use crate::types::{Dependency, Step, StepId};
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

/// Steps and prerequisite edges of one workflow.
///
/// # Example
///
/// ```
/// use stepflow_core::DependencyGraph;
///
/// let mut graph = DependencyGraph::new();
/// graph.add_step("build", "Compile sources").unwrap();
/// graph.add_step("test", "Run test suite").unwrap();
/// graph.add_dependency("test", "build").unwrap();
///
/// let order = graph.compute_execution_order().unwrap();
/// assert_eq!(order[0].as_str(), "build");
/// ```
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    /// Prerequisite -> dependent edges
    pub(crate) graph: DiGraph<Step, ()>,
    /// Step lookup, in insertion order
    pub(crate) step_map: IndexMap<StepId, NodeIndex>,
}

impl DependencyGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            step_map: IndexMap::new(),
        }
    }

    /// Builds a graph from steps and dependencies that were persisted earlier.
    ///
    /// Identifiers and endpoints are validated exactly as for
    /// [`add_step`](Self::add_step) and [`add_dependency`](Self::add_dependency),
    /// but edges are admitted without the cycle check. A cyclic input
    /// therefore loads successfully and is reported by
    /// [`compute_execution_order`](Self::compute_execution_order).
    pub fn load<S, D>(steps: S, dependencies: D) -> Result<Self>
    where
        S: IntoIterator<Item = Step>,
        D: IntoIterator<Item = Dependency>,
    {
        let mut graph = Self::new();
        for step in steps {
            graph.add_step(step.id, step.description)?;
        }
        for dependency in dependencies {
            let (step_idx, prerequisite_idx) =
                graph.endpoints(&dependency.step_id, &dependency.prerequisite_id)?;
            if !graph.graph.contains_edge(prerequisite_idx, step_idx) {
                graph.graph.add_edge(prerequisite_idx, step_idx, ());
            }
        }
        Ok(graph)
    }

    /// Adds a step with no dependencies.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the step was added
    /// - `Err(GraphError::InvalidStepId)` if the identifier is empty
    /// - `Err(GraphError::DuplicateStep)` if the identifier is already in use
    pub fn add_step(
        &mut self,
        step_id: impl Into<StepId>,
        description: impl Into<String>,
    ) -> Result<()> {
        let id = step_id.into();
        if id.is_blank() {
            return Err(GraphError::InvalidStepId(id.into_inner()));
        }
        if self.step_map.contains_key(&id) {
            return Err(GraphError::DuplicateStep(id));
        }

        let idx = self.graph.add_node(Step::new(id.clone(), description));
        self.step_map.insert(id.clone(), idx);
        tracing::debug!(step = %id, "step added");

        Ok(())
    }

    /// Records that `step_id` depends on `prerequisite_id`.
    ///
    /// Checks run in a fixed order and the first failure wins:
    ///
    /// 1. `UnknownStep` for `step_id`
    /// 2. `UnknownStep` for `prerequisite_id`
    /// 3. `SelfDependency`
    /// 4. `CyclicDependency` if `step_id` already precedes `prerequisite_id`
    ///
    /// Nothing is mutated on failure. Adding a pair that is already
    /// recorded is a no-op.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a new edge was recorded, `Ok(false)` if it already existed.
    pub fn add_dependency(
        &mut self,
        step_id: impl Into<StepId>,
        prerequisite_id: impl Into<StepId>,
    ) -> Result<bool> {
        let step_id = step_id.into();
        let prerequisite_id = prerequisite_id.into();
        let (step_idx, prerequisite_idx) = self.endpoints(&step_id, &prerequisite_id)?;

        if self.graph.contains_edge(prerequisite_idx, step_idx) {
            tracing::debug!(step = %step_id, prerequisite = %prerequisite_id, "dependency already recorded");
            return Ok(false);
        }

        // The new edge closes a cycle iff the dependent already reaches the prerequisite.
        if let Some(path) = self.find_path(step_idx, prerequisite_idx) {
            let mut cycle: Vec<StepId> = path
                .into_iter()
                .map(|idx| self.graph[idx].id.clone())
                .collect();
            cycle.push(step_id.clone());

            tracing::warn!(
                step = %step_id,
                prerequisite = %prerequisite_id,
                "rejected dependency that would create a cycle"
            );
            return Err(GraphError::CyclicDependency {
                step_id,
                prerequisite_id,
                path: cycle,
            });
        }

        self.graph.add_edge(prerequisite_idx, step_idx, ());
        tracing::debug!(step = %step_id, prerequisite = %prerequisite_id, "dependency added");

        Ok(true)
    }

    /// Returns step identifiers in an order that respects every dependency.
    ///
    /// Uses Kahn's algorithm. Among steps that are ready at the same time
    /// the lexicographically smallest identifier goes first, so the result
    /// is stable for a given graph.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<StepId>)` - Steps in execution order (empty for an empty graph)
    /// - `Err(GraphError::CycleDetected)` - Steps that could not be ordered
    pub fn compute_execution_order(&self) -> Result<Vec<StepId>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let degree = self.graph.neighbors_directed(idx, Direction::Incoming).count();
                (idx, degree)
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(&StepId, NodeIndex)>> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&idx, _)| Reverse((&self.graph[idx].id, idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((id, idx))) = ready.pop() {
            order.push(id.clone());

            for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((&self.graph[dependent].id, dependent)));
                    }
                }
            }
        }

        if order.len() < self.graph.node_count() {
            let mut unprocessed: Vec<StepId> = in_degree
                .into_iter()
                .filter(|&(_, degree)| degree > 0)
                .map(|(idx, _)| self.graph[idx].id.clone())
                .collect();
            unprocessed.sort();
            return Err(GraphError::CycleDetected(unprocessed));
        }

        Ok(order)
    }

    /// Returns the step record for an identifier.
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.step_map.get(id).map(|&idx| &self.graph[idx])
    }

    /// Returns all steps in the order they were added.
    pub fn steps(&self) -> impl Iterator<Item = &Step> + '_ {
        self.step_map.values().map(move |&idx| &self.graph[idx])
    }

    /// Returns every recorded dependency, sorted by dependent then prerequisite.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut dependencies: Vec<Dependency> = self
            .graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(prerequisite, step)| {
                Dependency::new(self.graph[step].id.clone(), self.graph[prerequisite].id.clone())
            })
            .collect();
        dependencies.sort();
        dependencies
    }

    /// Returns the direct prerequisites of a step, sorted.
    pub fn prerequisites(&self, id: &StepId) -> Option<Vec<StepId>> {
        self.step_map
            .get(id)
            .map(|&idx| self.sorted_neighbors(idx, Direction::Incoming))
            .map(|indices| self.ids_of(indices))
    }

    /// Returns the steps that directly depend on a step, sorted.
    pub fn dependents(&self, id: &StepId) -> Option<Vec<StepId>> {
        self.step_map
            .get(id)
            .map(|&idx| self.sorted_neighbors(idx, Direction::Outgoing))
            .map(|indices| self.ids_of(indices))
    }

    /// Returns steps with no prerequisites, sorted.
    pub fn ready_steps(&self) -> Vec<StepId> {
        let mut ready: Vec<StepId> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].id.clone())
            .collect();
        ready.sort();
        ready
    }

    /// Checks if a step exists in this graph.
    pub fn contains_step(&self, id: &StepId) -> bool {
        self.step_map.contains_key(id)
    }

    /// Returns the number of steps.
    pub fn step_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of recorded dependencies.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true if the stored edges contain no cycle.
    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Resolves both endpoints of a dependency, in admission-check order.
    fn endpoints(
        &self,
        step_id: &StepId,
        prerequisite_id: &StepId,
    ) -> Result<(NodeIndex, NodeIndex)> {
        let step_idx = *self
            .step_map
            .get(step_id)
            .ok_or_else(|| GraphError::UnknownStep(step_id.clone()))?;
        let prerequisite_idx = *self
            .step_map
            .get(prerequisite_id)
            .ok_or_else(|| GraphError::UnknownStep(prerequisite_id.clone()))?;

        if step_idx == prerequisite_idx {
            return Err(GraphError::SelfDependency(step_id.clone()));
        }

        Ok((step_idx, prerequisite_idx))
    }

    /// Shortest path from `from` to `to` along prerequisite -> dependent edges.
    ///
    /// Neighbors are visited in identifier order so the reported path is
    /// the same on every run.
    fn find_path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to];
                let mut node = to;
                while let Some(&parent) = parents.get(&node) {
                    path.push(parent);
                    node = parent;
                }
                path.reverse();
                return Some(path);
            }

            for next in self.sorted_neighbors(current, Direction::Outgoing) {
                if next != from && !parents.contains_key(&next) {
                    parents.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));
        neighbors
    }

    fn ids_of(&self, indices: Vec<NodeIndex>) -> Vec<StepId> {
        indices
            .into_iter()
            .map(|idx| self.graph[idx].id.clone())
            .collect()
    }
}
