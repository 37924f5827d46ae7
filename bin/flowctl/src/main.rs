//! `flowctl`: inspect and edit workflow JSON files from the command line.
//!
//! Every subcommand reads a workflow file and writes pretty JSON to stdout.
//! Logs go to stderr and are controlled with `RUST_LOG`.

use clap::{Parser, Subcommand};
use flowcanvas_core::{ActionId, Result};
use flowcanvas_editor::{EditorConfig, EditorSession, ToolbarNode, project};
use flowcanvas_workflow::{ActionGraph, ActionType, Workflow};
use rootcause::Report;
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inspect and edit flowcanvas workflows
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the node/edge graph of a workflow
    Project {
        /// Workflow JSON file
        file: PathBuf,
    },
    /// Check the structural invariants of a workflow
    Validate {
        /// Workflow JSON file
        file: PathBuf,
    },
    /// Insert a new step on an edge and print the updated workflow
    Insert {
        /// Workflow JSON file
        file: PathBuf,
        /// Id of the edge to insert into, e.g. `continue_trigger_node->exit_node`
        #[arg(long)]
        edge: String,
        /// Type of the step to insert
        #[arg(long = "type")]
        action_type: String,
    },
    /// Delete steps and print the reconnected workflow
    Delete {
        /// Workflow JSON file
        file: PathBuf,
        /// Ids of the steps to delete
        #[arg(required = true)]
        action_ids: Vec<ActionId>,
    },
}

/// Errors reported by the CLI.
#[derive(Debug)]
enum CliError {
    Config { reason: String },
    ReadFile { path: PathBuf, reason: String },
    ParseWorkflow { path: PathBuf, reason: String },
    InvalidWorkflow { reason: String },
    UnknownEdge { edge_id: String },
    EditFailed { reason: String },
    Output { reason: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::ReadFile { path, reason } => {
                write!(f, "could not read {}: {reason}", path.display())
            }
            Self::ParseWorkflow { path, reason } => {
                write!(f, "{} is not a workflow: {reason}", path.display())
            }
            Self::InvalidWorkflow { reason } => write!(f, "invalid workflow: {reason}"),
            Self::UnknownEdge { edge_id } => write!(f, "no edge with id {edge_id}"),
            Self::EditFailed { reason } => write!(f, "{reason}"),
            Self::Output { reason } => write!(f, "could not write output: {reason}"),
        }
    }
}

impl std::error::Error for CliError {}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EditorConfig::from_env().map_err(|e| CliError::Config {
        reason: e.to_string(),
    })?;
    debug!(?config, "loaded configuration");

    let output = run(cli.command, config)?;
    println!("{output}");
    Ok(())
}

fn run(command: Command, config: EditorConfig) -> Result<String, CliError> {
    let value = match command {
        Command::Project { file } => {
            let workflow = read_workflow(&file)?;
            let graph = project(&workflow).map_err(|e| CliError::EditFailed {
                reason: e.to_string(),
            })?;
            serde_json::to_value(graph)
        }
        Command::Validate { file } => {
            let workflow = read_workflow(&file)?;
            workflow.validate().map_err(|e| CliError::InvalidWorkflow {
                reason: e.to_string(),
            })?;
            let graph = ActionGraph::from_workflow(&workflow).map_err(|e| {
                CliError::InvalidWorkflow {
                    reason: e.to_string(),
                }
            })?;
            let reachable = workflow
                .first_of_type(&ActionType::Trigger)
                .map(|trigger| graph.reachable_from(&trigger.id))
                .unwrap_or_default();
            let unreachable: Vec<&ActionId> = workflow
                .actions
                .iter()
                .map(|action| &action.id)
                .filter(|id| !reachable.contains(*id))
                .collect();
            info!(unreachable = unreachable.len(), "workflow is valid");
            Ok(json!({
                "valid": true,
                "steps": graph.node_count(),
                "connections": graph.edge_count(),
                "unreachable": unreachable,
            }))
        }
        Command::Insert {
            file,
            edge,
            action_type,
        } => {
            let mut session = EditorSession::new(read_workflow(&file)?, config);
            let graph = session.graph().map_err(edit_failed)?;
            let target = graph
                .edge(&edge)
                .cloned()
                .ok_or(CliError::UnknownEdge { edge_id: edge })?;
            let toolbar = ToolbarNode::new(ActionType::from(action_type.as_str()));
            let action_id = session.insert(&toolbar, &target).map_err(edit_failed)?;
            info!(action_id = %action_id, "inserted step");
            serde_json::to_value(session.workflow())
        }
        Command::Delete { file, action_ids } => {
            let mut session = EditorSession::new(read_workflow(&file)?, config);
            session.delete(&action_ids).map_err(edit_failed)?;
            serde_json::to_value(session.workflow())
        }
    }
    .map_err(|e| CliError::Output {
        reason: e.to_string(),
    })?;

    Ok(serde_json::to_string_pretty(&value).map_err(|e| CliError::Output {
        reason: e.to_string(),
    })?)
}

fn edit_failed(report: Report<flowcanvas_editor::EditorError>) -> CliError {
    CliError::EditFailed {
        reason: report.to_string(),
    }
}

fn read_workflow(path: &Path) -> Result<Workflow, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CliError::ReadFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let workflow = serde_json::from_str(&raw).map_err(|e| CliError::ParseWorkflow {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(workflow)
}
