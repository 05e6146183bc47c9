//! Job and task definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::{Error, Result};

/// One scheduled invocation of a tool within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    /// Name of the tool to run.
    pub tool: String,
    /// Extra configuration files merged in for this task only.
    #[serde(default)]
    pub configs: Vec<PathBuf>,
}

/// A task as written in configuration: either just a tool name or a full spec.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskEntry {
    Name(String),
    Full(TaskSpec),
}

impl From<TaskEntry> for TaskSpec {
    fn from(entry: TaskEntry) -> Self {
        match entry {
            TaskEntry::Name(tool) => TaskSpec {
                tool,
                configs: Vec::new(),
            },
            TaskEntry::Full(spec) => spec,
        }
    }
}

/// Parse the task list of a job from its resolved configuration value.
pub fn parse_tasks(job: &str, value: &Value) -> Result<Vec<TaskSpec>> {
    let entries: Vec<TaskEntry> = serde_json::from_value(value.clone())
        .map_err(|e| Error::InvalidJob(format!("job '{}': {}", job, e)))?;

    let tasks: Vec<TaskSpec> = entries.into_iter().map(TaskSpec::from).collect();
    if let Some(task) = tasks.iter().find(|t| t.tool.is_empty()) {
        return Err(Error::InvalidJob(format!(
            "job '{}' has a task with an empty tool name ({:?})",
            job, task
        )));
    }
    Ok(tasks)
}

/// State of a task during execution.
///
/// A task moves forward through the states in declaration order; any state
/// may fall into `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    ConfigLoaded,
    Resolved,
    ToolInstantiated,
    StepsRunning { step: String },
    Done,
    Failed { message: String },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Done)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::ConfigLoaded => "config-loaded",
            TaskState::Resolved => "resolved",
            TaskState::ToolInstantiated => "tool-instantiated",
            TaskState::StepsRunning { .. } => "steps-running",
            TaskState::Done => "done",
            TaskState::Failed { .. } => "failed",
        }
    }
}
