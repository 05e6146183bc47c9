//! Orchestrator error types.

use std::path::PathBuf;
use thiserror::Error;
use toolbox_config::ConfigError;

use crate::orchestrator::JobSummary;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("'{0}' has a descriptor but no registered implementation")]
    NotATool(String),

    #[error("schema validation failed for '{path}' ({description}): {message}")]
    SchemaValidation {
        path: String,
        description: String,
        message: String,
    },

    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),

    #[error("required file not found: {0}")]
    MissingRequiredFile(PathBuf),

    #[error("invalid tool manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("no tools listed in {0}")]
    NoTools(PathBuf),

    #[error("no jobs defined in configuration")]
    NoJobs,

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("tool '{tool}' inherits from unknown tool '{parent}'")]
    UnknownParent { tool: String, parent: String },

    #[error("inheritance cycle: {0}")]
    InheritanceCycle(String),

    #[error("failed to construct tool '{tool}': {source}")]
    ToolConstruction {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("step '{step}' of tool '{tool}' failed: {source}")]
    StepFailed {
        tool: String,
        step: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("task {index} ({tool}) failed: {source}")]
    TaskFailed {
        index: usize,
        tool: String,
        #[source]
        source: Box<OrchestratorError>,
        /// Reports up to and including the failed task.
        summary: Box<JobSummary>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] toolbox_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;
