//! Core domain types for the toolbox job runner.
//!
//! This crate contains:
//! - Run identifiers
//! - Tool descriptors (the `tool.yml` contract of a tool plugin)
//! - Job and task definitions, and the task state machine

pub mod descriptor;
pub mod error;
pub mod id;
pub mod job;

pub use descriptor::{PropertySpec, ToolDescriptor};
pub use error::{Error, Result};
pub use id::RunId;
pub use job::{TaskSpec, TaskState};
