//! YAML workflow definitions.
//!
//! A definition describes a whole workflow at once: its identifier,
//! display name, steps, and the prerequisites of each step. Converting a
//! definition goes through [`DependencyGraph::load`], the bulk path, so a
//! cyclic definition still converts and the cycle surfaces when the
//! execution order is computed.

use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::types::{Dependency, Step, WorkflowId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Workflow definition from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow identifier
    pub id: WorkflowId,
    /// Display name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow steps
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// Step definition from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step identifier, unique within the workflow
    pub id: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Identifiers of the steps that must run first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Errors that can occur while loading a workflow definition.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// Invalid definition schema
    #[error("Invalid workflow definition: {0}")]
    InvalidSchema(String),

    /// The steps or dependencies do not form a loadable graph
    #[error("Invalid workflow graph: {0}")]
    Graph(#[from] GraphError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl WorkflowDefinition {
    /// Returns every dependency declared by the steps, in declaration order.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.steps
            .iter()
            .flat_map(|step| {
                step.depends_on
                    .iter()
                    .map(move |prerequisite| Dependency::new(step.id.as_str(), prerequisite.as_str()))
            })
            .collect()
    }

    /// Builds the dependency graph described by this definition.
    ///
    /// # Returns
    ///
    /// - `Ok(DependencyGraph)` - Graph with every declared step and edge
    /// - `Err(DefinitionError::InvalidSchema)` - If the workflow id is empty
    /// - `Err(DefinitionError::Graph)` - Duplicate, unknown, or self-referencing steps
    pub fn to_graph(&self) -> Result<DependencyGraph, DefinitionError> {
        if self.id.is_blank() {
            return Err(DefinitionError::InvalidSchema(
                "Workflow id must not be empty".to_string(),
            ));
        }

        let steps = self
            .steps
            .iter()
            .map(|step| Step::new(step.id.as_str(), step.description.as_str()));
        let graph = DependencyGraph::load(steps, self.dependencies())?;

        Ok(graph)
    }
}

/// Loads a workflow definition from a YAML file.
pub async fn load_definition_from_file(path: &Path) -> Result<WorkflowDefinition, DefinitionError> {
    let content = tokio::fs::read_to_string(path).await?;
    load_definition_from_string(&content)
}

/// Loads a workflow definition from a YAML string.
///
/// # Example
///
/// ```
/// use stepflow_core::definition::load_definition_from_string;
///
/// let yaml = r#"
/// id: release
/// name: "Release"
/// steps:
///   - id: build
///     description: "Compile"
///   - id: publish
///     description: "Upload artifacts"
///     depends_on: [build]
/// "#;
///
/// let definition = load_definition_from_string(yaml).unwrap();
/// let graph = definition.to_graph().unwrap();
/// assert_eq!(graph.dependency_count(), 1);
/// ```
pub fn load_definition_from_string(yaml: &str) -> Result<WorkflowDefinition, DefinitionError> {
    let definition: WorkflowDefinition = serde_yaml::from_str(yaml)?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepId;

    #[test]
    fn test_parse_basic() {
        let yaml = r#"
id: "etl"
name: "Nightly ETL"
steps:
  - id: "extract"
    description: "Pull rows"
"#;

        let definition = load_definition_from_string(yaml).unwrap();
        assert_eq!(definition.id, WorkflowId::new("etl"));
        assert_eq!(definition.name, "Nightly ETL");
        assert_eq!(definition.description, None);
        assert_eq!(definition.steps.len(), 1);
        assert!(definition.steps[0].depends_on.is_empty());
    }

    #[test]
    fn test_parse_with_dependencies() {
        let yaml = r#"
id: "etl"
name: "Nightly ETL"
description: "Moves data around"
steps:
  - id: "load"
    description: "Write rows"
    depends_on: ["transform"]
  - id: "transform"
    depends_on: ["extract"]
  - id: "extract"
"#;

        let definition = load_definition_from_string(yaml).unwrap();
        assert_eq!(
            definition.dependencies(),
            vec![
                Dependency::new("load", "transform"),
                Dependency::new("transform", "extract"),
            ]
        );

        let graph = definition.to_graph().unwrap();
        assert_eq!(
            graph.compute_execution_order().unwrap(),
            vec![StepId::new("extract"), StepId::new("transform"), StepId::new("load")]
        );
    }

    #[test]
    fn test_cyclic_definition_converts() {
        let yaml = r#"
id: "loop"
name: "Loop"
steps:
  - id: "a"
    depends_on: ["b"]
  - id: "b"
    depends_on: ["a"]
"#;

        let graph = load_definition_from_string(yaml).unwrap().to_graph().unwrap();
        assert!(matches!(
            graph.compute_execution_order(),
            Err(GraphError::CycleDetected(_))
        ));
    }

    #[test]
    fn test_unknown_prerequisite() {
        let yaml = r#"
id: "broken"
name: "Broken"
steps:
  - id: "a"
    depends_on: ["ghost"]
"#;

        let result = load_definition_from_string(yaml).unwrap().to_graph();
        assert!(matches!(
            result,
            Err(DefinitionError::Graph(GraphError::UnknownStep(id))) if id.as_str() == "ghost"
        ));
    }

    #[test]
    fn test_empty_workflow_id() {
        let yaml = "id: \"\"\nname: \"Nameless\"\n";
        let result = load_definition_from_string(yaml).unwrap().to_graph();
        assert!(matches!(result, Err(DefinitionError::InvalidSchema(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_definition_from_string("steps: [unterminated");
        assert!(matches!(result, Err(DefinitionError::YamlParse(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("workflow.yaml");
        tokio::fs::write(&path, "id: w\nname: W\nsteps:\n  - id: only\n")
            .await
            .unwrap();

        let definition = load_definition_from_file(&path).await.unwrap();
        assert_eq!(definition.steps[0].id, "only");
    }
}
