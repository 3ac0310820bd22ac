//! Error types for graph operations.

use crate::types::StepId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by [`DependencyGraph`](crate::graph::DependencyGraph).
///
/// Every variant is a deterministic function of the graph state and the
/// input: retrying the same call reproduces the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Step identifier is empty
    #[error("Invalid step id: {0:?}")]
    InvalidStepId(String),

    /// Step identifier already used in this workflow
    #[error("Duplicate step: {0}")]
    DuplicateStep(StepId),

    /// Reference to a step that is not part of this workflow
    #[error("Step not found: {0}")]
    UnknownStep(StepId),

    /// A step named as its own prerequisite
    #[error("Step '{0}' cannot depend on itself")]
    SelfDependency(StepId),

    /// Admitting the edge would close a cycle
    #[error("Dependency of '{step_id}' on '{prerequisite_id}' would create a cycle: {}", format_path(.path))]
    CyclicDependency {
        /// The dependent step of the rejected edge
        step_id: StepId,
        /// The prerequisite step of the rejected edge
        prerequisite_id: StepId,
        /// Steps on the cycle, starting and ending at `step_id`
        path: Vec<StepId>,
    },

    /// The ordering query found steps that can never become ready
    #[error("Cycle detected in workflow involving steps: {}", format_path(.0))]
    CycleDetected(Vec<StepId>),
}

impl GraphError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStepId(_) => ErrorKind::InvalidIdentifier,
            Self::DuplicateStep(_) => ErrorKind::DuplicateStep,
            Self::UnknownStep(_) => ErrorKind::UnknownStep,
            Self::SelfDependency(_) => ErrorKind::SelfDependency,
            Self::CyclicDependency { .. } => ErrorKind::CyclicDependency,
            Self::CycleDetected(_) => ErrorKind::CycleDetected,
        }
    }

    /// Returns the step identifiers implicated in this error.
    pub fn steps(&self) -> Vec<StepId> {
        match self {
            Self::InvalidStepId(_) => Vec::new(),
            Self::DuplicateStep(id) | Self::UnknownStep(id) | Self::SelfDependency(id) => {
                vec![id.clone()]
            }
            Self::CyclicDependency { path, .. } => path.clone(),
            Self::CycleDetected(steps) => steps.clone(),
        }
    }

    /// Returns true if the error means a stored graph violates acyclicity.
    ///
    /// Admission errors leave the graph untouched; this one means a cycle
    /// is already present.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::CycleDetected(_))
    }
}

/// Stable error classification for callers that map errors onto responses.
///
/// This is the shared wire taxonomy for every StepFlow layer. The graph
/// only produces the step-level kinds; `WorkflowNotFound`,
/// `WorkflowExists`, `InvalidDefinition` and `Storage` are assigned by the
/// runtime so that every error response draws its `kind` from one enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidIdentifier,
    DuplicateStep,
    UnknownStep,
    SelfDependency,
    CyclicDependency,
    CycleDetected,
    WorkflowNotFound,
    WorkflowExists,
    InvalidDefinition,
    Storage,
}

impl ErrorKind {
    /// Returns the snake_case code for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier => "invalid_identifier",
            Self::DuplicateStep => "duplicate_step",
            Self::UnknownStep => "unknown_step",
            Self::SelfDependency => "self_dependency",
            Self::CyclicDependency => "cyclic_dependency",
            Self::CycleDetected => "cycle_detected",
            Self::WorkflowNotFound => "workflow_not_found",
            Self::WorkflowExists => "workflow_exists",
            Self::InvalidDefinition => "invalid_definition",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type alias for Result with GraphError.
pub type Result<T> = std::result::Result<T, GraphError>;

fn format_path(path: &[StepId]) -> String {
    path.iter()
        .map(StepId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
