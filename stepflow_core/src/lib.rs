//! StepFlow core - Workflow step dependency graph.
//!
//! This crate owns the one piece of real logic in StepFlow: tracking the
//! steps of a workflow and the prerequisite edges between them, admitting
//! new edges only when they keep the graph acyclic, and deriving a
//! deterministic execution order.
//!
//! # Quick Start
//!
//! ```
//! use stepflow_core::{DependencyGraph, GraphError, StepId};
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_step("x", "First").unwrap();
//! graph.add_step("y", "Second").unwrap();
//! graph.add_dependency("y", "x").unwrap();
//!
//! // Closing the loop is rejected and leaves the graph unchanged
//! let err = graph.add_dependency("x", "y").unwrap_err();
//! assert!(matches!(err, GraphError::CyclicDependency { .. }));
//!
//! let order = graph.compute_execution_order().unwrap();
//! assert_eq!(order, vec![StepId::new("x"), StepId::new("y")]);
//! ```
//!
//! # Modules
//!
//! - [`types`]: Identifiers and records
//! - [`error`]: Error taxonomy
//! - [`graph`]: The dependency graph and ordering
//! - [`validate`]: Structural reports (cycles, isolated steps)
//! - [`definition`]: YAML workflow definitions

pub mod definition;
pub mod error;
pub mod graph;
pub mod types;
pub mod validate;

pub use definition::{DefinitionError, StepDefinition, WorkflowDefinition};
pub use error::{ErrorKind, GraphError, Result};
pub use graph::DependencyGraph;
pub use types::{Dependency, Step, StepId, WorkflowId};
pub use validate::{GraphValidator, ValidationReport};
