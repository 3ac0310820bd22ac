//! Error types for the runtime layer.

use serde::{Deserialize, Serialize};
use stepflow_core::{DefinitionError, ErrorKind, GraphError, StepId, WorkflowId};

/// Main error type for store and service operations.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    /// No workflow with this identifier.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(WorkflowId),

    /// Workflow identifier already in use.
    #[error("Workflow already exists: {0}")]
    WorkflowExists(WorkflowId),

    /// Workflow identifier is empty.
    #[error("Invalid workflow id: {0:?}")]
    InvalidWorkflowId(String),

    /// Graph admission or ordering failure.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Workflow definition could not be loaded.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Snapshot file version is not understood.
    #[error("Unsupported snapshot version: {0}")]
    UnsupportedSnapshot(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WorkflowNotFound(_) => ErrorKind::WorkflowNotFound,
            Self::WorkflowExists(_) => ErrorKind::WorkflowExists,
            Self::InvalidWorkflowId(_) => ErrorKind::InvalidIdentifier,
            Self::Graph(err) => err.kind(),
            Self::Definition(DefinitionError::Graph(err)) => err.kind(),
            Self::Definition(DefinitionError::Io(_)) => ErrorKind::Storage,
            Self::Definition(_) => ErrorKind::InvalidDefinition,
            Self::UnsupportedSnapshot(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Storage,
        }
    }

    /// Returns the step identifiers implicated in this error.
    pub fn steps(&self) -> Vec<StepId> {
        match self {
            Self::Graph(err) | Self::Definition(DefinitionError::Graph(err)) => err.steps(),
            _ => Vec::new(),
        }
    }

    /// Converts the error into the payload returned to callers.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
            steps: self.steps(),
        }
    }
}

/// Failure payload: error kind, readable message, offending steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepId>,
}

/// Type alias for Result with ServiceError.
pub type Result<T> = std::result::Result<T, ServiceError>;
