//! StepFlow runtime layer - Workflow store, service and CLI.
//!
//! This crate wraps the [`stepflow_core`] dependency graph in the
//! collaborators a deployment needs:
//!
//! - [`store`]: In-memory workflow registry with one lock per workflow
//! - [`service`]: Capability surface returning serializable payloads
//! - [`snapshot`]: JSON persistence of the whole store
//! - [`config`]: Runtime configuration from defaults and environment
//! - [`cli`]: The `stepflow` command-line front end

pub mod cli;
pub mod config;
pub mod error;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod telemetry;

pub use config::RuntimeConfig;
pub use error::{ErrorResponse, Result, ServiceError};
pub use service::{
    DependencyAdded, ExecutionOrder, StepAdded, StepDetail, ValidationSummary, WorkflowCreated,
    WorkflowDetails, WorkflowService, WorkflowSummary,
};
pub use snapshot::StoreLock;
pub use store::{WorkflowRecord, WorkflowStore};
