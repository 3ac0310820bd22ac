//! Workflow service.
//!
//! The capability surface consumed by request handlers: each method is
//! one logical operation against one workflow, returning a serializable
//! payload on success and a [`ServiceError`] on failure. Graph work for a
//! workflow always runs under that workflow's lock in the store.

use serde::{Deserialize, Serialize};
use stepflow_core::{
    Dependency, GraphValidator, StepId, ValidationReport, WorkflowDefinition, WorkflowId,
};

use crate::error::{Result, ServiceError};
use crate::store::{WorkflowRecord, WorkflowStore};

/// Result of creating a workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCreated {
    pub workflow_id: WorkflowId,
    pub name: String,
}

/// Identifier, name, and size of a workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub workflow_id: WorkflowId,
    pub name: String,
    pub step_count: usize,
    pub dependency_count: usize,
}

/// Result of registering a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAdded {
    pub workflow_id: WorkflowId,
    pub step_id: StepId,
}

/// Result of registering a dependency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyAdded {
    pub workflow_id: WorkflowId,
    pub step_id: StepId,
    pub prerequisite_step_id: StepId,
    /// False when the pair was already recorded
    pub created: bool,
}

/// A step with its direct prerequisites.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDetail {
    pub step_id: StepId,
    pub description: String,
    pub prerequisites: Vec<StepId>,
}

/// Full read-only view of a workflow graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDetails {
    pub workflow_id: WorkflowId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Steps in the order they were added
    pub steps: Vec<StepDetail>,
    pub dependencies: Vec<Dependency>,
}

/// Execution order of a workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOrder {
    pub workflow_id: WorkflowId,
    pub order: Vec<StepId>,
}

/// Structural report for a workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub workflow_id: WorkflowId,
    pub valid: bool,
    pub cycles: Vec<Vec<StepId>>,
    pub isolated_steps: Vec<StepId>,
}

impl ValidationSummary {
    fn from_report(workflow_id: WorkflowId, report: &ValidationReport) -> Self {
        Self {
            workflow_id,
            valid: report.is_valid(),
            cycles: report.cycles().to_vec(),
            isolated_steps: report.isolated_steps().to_vec(),
        }
    }
}

/// Workflow operations over a [`WorkflowStore`].
#[derive(Clone, Debug, Default)]
pub struct WorkflowService {
    store: WorkflowStore,
}

impl WorkflowService {
    /// Creates a service over an existing store.
    pub fn new(store: WorkflowStore) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// Creates an empty workflow.
    pub fn create_workflow(
        &self,
        workflow_id: impl Into<WorkflowId>,
        name: impl Into<String>,
    ) -> Result<WorkflowCreated> {
        let workflow_id = workflow_id.into();
        let name = name.into();

        self.store.create(workflow_id.clone(), name.clone())?;
        tracing::info!(workflow = %workflow_id, "workflow created");

        Ok(WorkflowCreated { workflow_id, name })
    }

    /// Updates a workflow's display name.
    pub fn rename_workflow(
        &self,
        workflow_id: &WorkflowId,
        name: impl Into<String>,
    ) -> Result<WorkflowSummary> {
        let name = name.into();
        self.store.with_workflow_mut(workflow_id, |record| {
            record.name = name;
            summarize(record)
        })
    }

    /// Deletes a workflow with its steps and dependencies.
    pub fn delete_workflow(&self, workflow_id: &WorkflowId) -> Result<()> {
        self.store.delete(workflow_id)?;
        tracing::info!(workflow = %workflow_id, "workflow deleted");
        Ok(())
    }

    /// Lists all workflows, sorted by identifier.
    ///
    /// A workflow deleted while the listing runs is skipped.
    pub fn list_workflows(&self) -> Vec<WorkflowSummary> {
        self.store
            .ids()
            .iter()
            .filter_map(|id| self.store.with_workflow(id, summarize).ok())
            .collect()
    }

    /// Registers a step in a workflow.
    pub fn add_step(
        &self,
        workflow_id: &WorkflowId,
        step_id: impl Into<StepId>,
        description: impl Into<String>,
    ) -> Result<StepAdded> {
        let step_id = step_id.into();
        let description = description.into();

        self.store
            .with_workflow_mut(workflow_id, |record| {
                record.graph.add_step(step_id.clone(), description)
            })??;

        Ok(StepAdded {
            workflow_id: workflow_id.clone(),
            step_id,
        })
    }

    /// Registers that `step_id` depends on `prerequisite_step_id`.
    pub fn add_dependency(
        &self,
        workflow_id: &WorkflowId,
        step_id: impl Into<StepId>,
        prerequisite_step_id: impl Into<StepId>,
    ) -> Result<DependencyAdded> {
        let step_id = step_id.into();
        let prerequisite_step_id = prerequisite_step_id.into();

        let created = self.store.with_workflow_mut(workflow_id, |record| {
            record
                .graph
                .add_dependency(step_id.clone(), prerequisite_step_id.clone())
        })??;

        Ok(DependencyAdded {
            workflow_id: workflow_id.clone(),
            step_id,
            prerequisite_step_id,
            created,
        })
    }

    /// Returns every step with its prerequisites, plus the edge list.
    pub fn workflow_details(&self, workflow_id: &WorkflowId) -> Result<WorkflowDetails> {
        self.store.with_workflow(workflow_id, details_of)
    }

    /// Computes the execution order of a workflow.
    pub fn execution_order(&self, workflow_id: &WorkflowId) -> Result<ExecutionOrder> {
        let order = self
            .store
            .with_workflow(workflow_id, |record| record.graph.compute_execution_order())?
            .map_err(|err| {
                if err.is_invariant_violation() {
                    tracing::error!(workflow = %workflow_id, error = %err, "stored workflow graph is cyclic");
                }
                ServiceError::from(err)
            })?;

        Ok(ExecutionOrder {
            workflow_id: workflow_id.clone(),
            order,
        })
    }

    /// Reports cycles and isolated steps of a workflow.
    pub fn validate_workflow(&self, workflow_id: &WorkflowId) -> Result<ValidationSummary> {
        self.store.with_workflow(workflow_id, |record| {
            let report = GraphValidator::new().validate(&record.graph);
            ValidationSummary::from_report(record.id.clone(), &report)
        })
    }

    /// Imports a workflow definition as a new workflow.
    ///
    /// Edges are bulk-loaded without the admission cycle check. A cyclic
    /// definition is stored and logged; its execution order reports the cycle.
    pub fn import_definition(&self, definition: &WorkflowDefinition) -> Result<WorkflowDetails> {
        let graph = definition.to_graph()?;

        let report = GraphValidator::new().validate(&graph);
        if !report.is_valid() {
            tracing::warn!(
                workflow = %definition.id,
                cycles = ?report.cycles(),
                "imported workflow contains dependency cycles"
            );
        }

        let record = WorkflowRecord::with_graph(definition.id.clone(), definition.name.clone(), graph)
            .with_description(definition.description.clone());
        let details = details_of(&record);
        self.store.insert_record(record)?;
        tracing::info!(workflow = %definition.id, steps = details.steps.len(), "workflow imported");

        Ok(details)
    }
}

fn summarize(record: &WorkflowRecord) -> WorkflowSummary {
    WorkflowSummary {
        workflow_id: record.id.clone(),
        name: record.name.clone(),
        step_count: record.graph.step_count(),
        dependency_count: record.graph.dependency_count(),
    }
}

fn details_of(record: &WorkflowRecord) -> WorkflowDetails {
    let steps = record
        .graph
        .steps()
        .map(|step| StepDetail {
            step_id: step.id.clone(),
            description: step.description.clone(),
            prerequisites: record.graph.prerequisites(&step.id).unwrap_or_default(),
        })
        .collect();

    WorkflowDetails {
        workflow_id: record.id.clone(),
        name: record.name.clone(),
        description: record.description.clone(),
        steps,
        dependencies: record.graph.dependencies(),
    }
}
