//! In-memory workflow store.
//!
//! Each workflow lives behind its own `Mutex`, so operations on one
//! workflow are serialized while different workflows proceed in
//! parallel. The registry `RwLock` is held only long enough to look up,
//! insert, or remove a workflow handle.
//!
//! Poisoned locks are recovered: graph mutations are all-or-nothing, so a
//! panic in another holder cannot leave a half-applied change behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use stepflow_core::{DependencyGraph, WorkflowId};

use crate::error::{Result, ServiceError};

/// A workflow with its display name and dependency graph.
#[derive(Clone, Debug)]
pub struct WorkflowRecord {
    pub id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    pub graph: DependencyGraph,
}

impl WorkflowRecord {
    /// Creates a workflow record with an empty graph.
    pub fn new(id: WorkflowId, name: impl Into<String>) -> Self {
        Self::with_graph(id, name, DependencyGraph::new())
    }

    /// Creates a workflow record around an existing graph.
    pub fn with_graph(id: WorkflowId, name: impl Into<String>, graph: DependencyGraph) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            graph,
        }
    }

    /// Sets the free-text description.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

type WorkflowHandle = Arc<Mutex<WorkflowRecord>>;

/// Thread-safe registry of workflows.
///
/// Cloning is cheap and clones share the same workflows.
#[derive(Clone, Debug, Default)]
pub struct WorkflowStore {
    workflows: Arc<RwLock<HashMap<WorkflowId, WorkflowHandle>>>,
}

impl WorkflowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a workflow with no steps.
    pub fn create(&self, id: WorkflowId, name: impl Into<String>) -> Result<()> {
        self.insert_record(WorkflowRecord::new(id, name))
    }

    /// Inserts a fully built workflow record.
    ///
    /// # Returns
    ///
    /// - `Err(ServiceError::InvalidWorkflowId)` if the identifier is empty
    /// - `Err(ServiceError::WorkflowExists)` if the identifier is taken
    pub fn insert_record(&self, record: WorkflowRecord) -> Result<()> {
        if record.id.is_blank() {
            return Err(ServiceError::InvalidWorkflowId(record.id.as_str().to_string()));
        }

        let mut workflows = self.workflows.write().unwrap_or_else(PoisonError::into_inner);
        if workflows.contains_key(&record.id) {
            return Err(ServiceError::WorkflowExists(record.id));
        }
        workflows.insert(record.id.clone(), Arc::new(Mutex::new(record)));

        Ok(())
    }

    /// Updates the display name of a workflow.
    pub fn rename(&self, id: &WorkflowId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.with_workflow_mut(id, |record| record.name = name)
    }

    /// Removes a workflow together with its steps and dependencies.
    pub fn delete(&self, id: &WorkflowId) -> Result<()> {
        let mut workflows = self.workflows.write().unwrap_or_else(PoisonError::into_inner);
        workflows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::WorkflowNotFound(id.clone()))
    }

    /// Checks if a workflow exists.
    pub fn contains(&self, id: &WorkflowId) -> bool {
        self.workflows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Returns all workflow identifiers, sorted.
    pub fn ids(&self) -> Vec<WorkflowId> {
        let mut ids: Vec<WorkflowId> = self
            .workflows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Returns the number of workflows.
    pub fn len(&self) -> usize {
        self.workflows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if the store holds no workflows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` with shared access to one workflow, under its lock.
    pub fn with_workflow<R>(&self, id: &WorkflowId, f: impl FnOnce(&WorkflowRecord) -> R) -> Result<R> {
        let handle = self.handle(id)?;
        let record = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&record))
    }

    /// Runs `f` with exclusive access to one workflow, under its lock.
    pub fn with_workflow_mut<R>(
        &self,
        id: &WorkflowId,
        f: impl FnOnce(&mut WorkflowRecord) -> R,
    ) -> Result<R> {
        let handle = self.handle(id)?;
        let mut record = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut record))
    }

    fn handle(&self, id: &WorkflowId) -> Result<WorkflowHandle> {
        self.workflows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::WorkflowNotFound(id.clone()))
    }
}
