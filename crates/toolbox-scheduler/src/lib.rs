//! Tool registry and job orchestration for the toolbox job runner.
//!
//! Tools are registered by name in a dispatch table. The orchestrator loads
//! tool descriptors and configuration into a single namespace database, then
//! runs the tasks of a job sequentially, restoring the database after each
//! task so no task sees another's mutations.

pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod tool;

pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{
    INTERNAL_NAMESPACE, JobSummary, LoadedTool, TaskReport, Toolbox, ToolboxParams,
};
pub use registry::{ToolFactory, ToolRegistry};
pub use tool::{Step, Tool, ToolContext};
