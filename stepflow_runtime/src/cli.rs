//! Command-line interface for StepFlow.
//!
//! Every command locks the snapshot file, loads it, applies one logical
//! operation, writes the snapshot back if the operation mutated it, and
//! prints the result as JSON. Failures print an error payload to stderr and exit
//! with a non-zero status.
//!
//! # Examples
//!
//! ```bash
//! $ stepflow create release "Release pipeline"
//! $ stepflow add-step release build --description "Compile"
//! $ stepflow add-step release publish
//! $ stepflow add-dep release publish build
//! $ stepflow order release
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use stepflow_core::definition::load_definition_from_file;
use stepflow_core::WorkflowId;

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::service::WorkflowService;
use crate::snapshot;
use crate::telemetry;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "stepflow", version, about = "Workflow step dependencies and execution order")]
pub struct Cli {
    /// Snapshot file holding all workflows [env: STEPFLOW_STORE]
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Tracing filter directive [env: STEPFLOW_LOG]
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    action: Action,
}

/// Operations available via CLI.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create an empty workflow
    Create { workflow_id: String, name: String },

    /// Change a workflow's display name
    Rename { workflow_id: String, name: String },

    /// Delete a workflow with all its steps and dependencies
    Delete { workflow_id: String },

    /// List all workflows
    List,

    /// Register a step in a workflow
    AddStep {
        workflow_id: String,
        step_id: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Record that a step depends on a prerequisite step
    AddDep {
        workflow_id: String,
        step_id: String,
        prerequisite_step_id: String,
    },

    /// Show steps and dependencies of a workflow
    Show { workflow_id: String },

    /// Compute the execution order of a workflow
    Order { workflow_id: String },

    /// Import a workflow from a YAML definition
    Import { path: PathBuf },

    /// Report cycles and isolated steps of a workflow
    Validate { workflow_id: String },
}

impl Action {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Create { .. }
                | Self::Rename { .. }
                | Self::Delete { .. }
                | Self::AddStep { .. }
                | Self::AddDep { .. }
                | Self::Import { .. }
        )
    }
}

/// Outcome of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// JSON printed to stdout
    pub body: Value,
    /// Whether the snapshot must be written back
    pub mutated: bool,
}

impl CommandOutput {
    fn new(body: impl Serialize, mutated: bool) -> Result<Self> {
        Ok(Self {
            body: serde_json::to_value(body)?,
            mutated,
        })
    }
}

/// Applies one action to the service.
pub async fn execute(service: &WorkflowService, action: Action) -> Result<CommandOutput> {
    let mutated = action.mutates();

    match action {
        Action::Create { workflow_id, name } => {
            CommandOutput::new(service.create_workflow(workflow_id, name)?, mutated)
        }
        Action::Rename { workflow_id, name } => {
            CommandOutput::new(service.rename_workflow(&WorkflowId::new(workflow_id), name)?, mutated)
        }
        Action::Delete { workflow_id } => {
            let workflow_id = WorkflowId::new(workflow_id);
            service.delete_workflow(&workflow_id)?;
            CommandOutput::new(serde_json::json!({ "workflow_id": workflow_id, "status": "deleted" }), mutated)
        }
        Action::List => CommandOutput::new(service.list_workflows(), mutated),
        Action::AddStep {
            workflow_id,
            step_id,
            description,
        } => CommandOutput::new(
            service.add_step(&WorkflowId::new(workflow_id), step_id, description)?,
            mutated,
        ),
        Action::AddDep {
            workflow_id,
            step_id,
            prerequisite_step_id,
        } => CommandOutput::new(
            service.add_dependency(&WorkflowId::new(workflow_id), step_id, prerequisite_step_id)?,
            mutated,
        ),
        Action::Show { workflow_id } => {
            CommandOutput::new(service.workflow_details(&WorkflowId::new(workflow_id))?, mutated)
        }
        Action::Order { workflow_id } => {
            CommandOutput::new(service.execution_order(&WorkflowId::new(workflow_id))?, mutated)
        }
        Action::Import { path } => {
            let definition = load_definition_from_file(&path).await?;
            CommandOutput::new(service.import_definition(&definition)?, mutated)
        }
        Action::Validate { workflow_id } => {
            CommandOutput::new(service.validate_workflow(&WorkflowId::new(workflow_id))?, mutated)
        }
    }
}

impl Cli {
    /// Applies `--store` and `--log` over a base configuration.
    pub fn resolve_config(&self, mut config: RuntimeConfig) -> RuntimeConfig {
        if let Some(path) = &self.store {
            config = config.with_store_path(path.clone());
        }
        if let Some(filter) = &self.log {
            config = config.with_log_filter(filter.clone());
        }
        config
    }
}

/// Entry point for the CLI.
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.resolve_config(RuntimeConfig::from_env());
    telemetry::init_logging(&config.log_filter)?;

    run_with(cli, config).await
}

/// Runs one parsed command against the snapshot named by `config`.
///
/// The store lock is held from load until the snapshot is written back,
/// exclusive for mutating commands and shared otherwise.
pub async fn run_with(cli: Cli, config: RuntimeConfig) -> anyhow::Result<ExitCode> {
    let _lock = if cli.action.mutates() {
        snapshot::StoreLock::exclusive(&config.store_path)?
    } else {
        snapshot::StoreLock::shared(&config.store_path)?
    };

    let service = WorkflowService::new(snapshot::load_from_file(&config.store_path)?);

    match execute(&service, cli.action).await {
        Ok(output) => {
            if output.mutated {
                snapshot::save_to_file(service.store(), &config.store_path)?;
            }
            println!("{}", serde_json::to_string_pretty(&output.body)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if err.kind() == stepflow_core::ErrorKind::Storage {
                tracing::error!(error = %err, "command failed");
            }
            eprintln!("{}", serde_json::to_string_pretty(&err.to_response())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stepflow").chain(args.iter().copied())).unwrap()
    }

    async fn run_args(config: &RuntimeConfig, args: &[&str]) -> ExitCode {
        run_with(parse(args), config.clone()).await.unwrap()
    }

    fn seeded_config(dir: &std::path::Path) -> RuntimeConfig {
        RuntimeConfig::default().with_store_path(dir.join("flows.json"))
    }

    #[test]
    fn test_parse_add_step() {
        let cli = parse(&["--store", "flows.json", "add-step", "wf", "build", "-d", "Compile"]);

        assert_eq!(cli.store, Some(PathBuf::from("flows.json")));
        assert_eq!(
            cli.action,
            Action::AddStep {
                workflow_id: "wf".to_string(),
                step_id: "build".to_string(),
                description: "Compile".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_add_dep() {
        let cli = parse(&["add-dep", "wf", "test", "build"]);
        assert_eq!(
            cli.action,
            Action::AddDep {
                workflow_id: "wf".to_string(),
                step_id: "test".to_string(),
                prerequisite_step_id: "build".to_string(),
            }
        );
        assert!(cli.action.mutates());
        assert!(!Action::List.mutates());
    }

    #[tokio::test]
    async fn test_execute_sequence() {
        let service = WorkflowService::default();

        let created = execute(
            &service,
            Action::Create {
                workflow_id: "wf".to_string(),
                name: "Pipeline".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(created.mutated);
        assert_eq!(created.body["workflow_id"], "wf");

        for step in ["deploy", "build"] {
            execute(
                &service,
                Action::AddStep {
                    workflow_id: "wf".to_string(),
                    step_id: step.to_string(),
                    description: String::new(),
                },
            )
            .await
            .unwrap();
        }
        execute(
            &service,
            Action::AddDep {
                workflow_id: "wf".to_string(),
                step_id: "deploy".to_string(),
                prerequisite_step_id: "build".to_string(),
            },
        )
        .await
        .unwrap();

        let order = execute(&service, Action::Order { workflow_id: "wf".to_string() })
            .await
            .unwrap();
        assert!(!order.mutated);
        assert_eq!(order.body["order"], serde_json::json!(["build", "deploy"]));
    }

    #[tokio::test]
    async fn test_execute_reports_service_errors() {
        let service = WorkflowService::default();

        let err = execute(&service, Action::Show { workflow_id: "ghost".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::WorkflowNotFound(_)));
    }

    #[tokio::test]
    async fn test_execute_import() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("wf.yaml");
        tokio::fs::write(
            &path,
            "id: imported\nname: Imported\nsteps:\n  - id: b\n    depends_on: [a]\n  - id: a\n",
        )
        .await
        .unwrap();

        let service = WorkflowService::default();
        let output = execute(&service, Action::Import { path }).await.unwrap();

        assert!(output.mutated);
        assert_eq!(output.body["workflow_id"], "imported");
        assert_eq!(
            service.execution_order(&WorkflowId::new("imported")).unwrap().order,
            vec![stepflow_core::StepId::new("a"), stepflow_core::StepId::new("b")]
        );
    }

    #[test]
    fn test_store_flag_overrides_config() {
        let cli = parse(&["--store", "other.json", "--log", "debug", "list"]);
        let config = cli.resolve_config(RuntimeConfig::default());

        assert_eq!(config.store_path, PathBuf::from("other.json"));
        assert_eq!(config.log_filter, "debug");
    }

    #[tokio::test]
    async fn test_run_with_persists_mutations_only() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(temp.path());

        assert_eq!(run_args(&config, &["create", "wf", "Pipeline"]).await, ExitCode::SUCCESS);
        assert_eq!(run_args(&config, &["add-step", "wf", "build"]).await, ExitCode::SUCCESS);
        assert_eq!(run_args(&config, &["add-step", "wf", "test"]).await, ExitCode::SUCCESS);
        assert_eq!(run_args(&config, &["add-dep", "wf", "test", "build"]).await, ExitCode::SUCCESS);

        let bytes = std::fs::read(&config.store_path).unwrap();
        let modified = std::fs::metadata(&config.store_path).unwrap().modified().unwrap();

        for args in [
            &["order", "wf"][..],
            &["show", "wf"][..],
            &["list"][..],
            &["validate", "wf"][..],
        ] {
            assert_eq!(run_args(&config, args).await, ExitCode::SUCCESS);
        }

        assert_eq!(std::fs::read(&config.store_path).unwrap(), bytes);
        assert_eq!(
            std::fs::metadata(&config.store_path).unwrap().modified().unwrap(),
            modified
        );
    }

    #[tokio::test]
    async fn test_run_with_failure_exits_nonzero_and_keeps_snapshot() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(temp.path());

        run_args(&config, &["create", "wf", "Pipeline"]).await;
        run_args(&config, &["add-step", "wf", "build"]).await;
        let bytes = std::fs::read(&config.store_path).unwrap();

        let code = run_args(&config, &["add-dep", "wf", "build", "build"]).await;
        assert_eq!(code, ExitCode::FAILURE);
        let code = run_args(&config, &["add-dep", "wf", "build", "missing"]).await;
        assert_eq!(code, ExitCode::FAILURE);
        let code = run_args(&config, &["order", "ghost"]).await;
        assert_eq!(code, ExitCode::FAILURE);

        assert_eq!(std::fs::read(&config.store_path).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_run_with_read_on_missing_store_creates_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(temp.path());

        assert_eq!(run_args(&config, &["list"]).await, ExitCode::SUCCESS);
        assert!(!config.store_path.exists());
    }
}
