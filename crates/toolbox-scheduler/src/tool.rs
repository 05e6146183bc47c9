//! The `Tool` capability and the context tools run against.

use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use toolbox_config::{ConfigResult, Database, WritePolicy};
use toolbox_core::ToolDescriptor;
use tracing::{Level, debug, error, info, trace, warn};

use crate::orchestrator::INTERNAL_NAMESPACE;

/// A unit of work exposed by a tool plugin.
///
/// Implementations are created by a [`crate::ToolFactory`] once the tool's
/// namespaces have passed schema validation, and expose an ordered list of
/// steps. Steps run sequentially; the first failing step aborts the task.
pub trait Tool {
    fn steps(&self) -> Vec<Step<'_>>;
}

type StepFn<'a> = Box<dyn FnOnce(&mut ToolContext<'_>) -> anyhow::Result<()> + 'a>;

/// A named step of a tool.
pub struct Step<'a> {
    name: String,
    run: StepFn<'a>,
}

impl<'a> Step<'a> {
    pub fn new(
        name: impl Into<String>,
        run: impl FnOnce(&mut ToolContext<'_>) -> anyhow::Result<()> + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(self, ctx: &mut ToolContext<'_>) -> anyhow::Result<()> {
        (self.run)(ctx)
    }
}

impl fmt::Debug for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// What a tool sees while it is constructed and while its steps run.
///
/// Reads go to the whole namespace. Writes are guarded: nothing under the
/// internal namespace can be changed from a tool. Every change is discarded
/// when the task finishes.
pub struct ToolContext<'a> {
    descriptor: &'a ToolDescriptor,
    database: &'a mut Database,
}

impl<'a> ToolContext<'a> {
    pub fn new(descriptor: &'a ToolDescriptor, database: &'a mut Database) -> Self {
        Self {
            descriptor,
            database,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn namespace(&self) -> &str {
        self.descriptor.namespace()
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        self.descriptor
    }

    pub fn get(&self, path: &str) -> ConfigResult<&Value> {
        self.database.get(path)
    }

    pub fn get_as<T: serde::de::DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        self.database.get_as(path)
    }

    /// Value of one of this tool's own properties.
    pub fn property(&self, name: &str) -> ConfigResult<&Value> {
        self.database.get(&self.descriptor.property_path(name))
    }

    pub fn property_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> ConfigResult<T> {
        self.database.get_as(&self.descriptor.property_path(name))
    }

    pub fn set(&mut self, path: &str, value: Value) -> ConfigResult<()> {
        self.database.set(path, value, WritePolicy::Overwrite)
    }

    pub fn set_property(&mut self, name: &str, value: Value) -> ConfigResult<()> {
        let path = self.descriptor.property_path(name);
        self.database.set(&path, value, WritePolicy::Overwrite)
    }

    /// Extend the sequence at `path` with the items of `value`.
    pub fn append(&mut self, path: &str, value: Value) -> ConfigResult<()> {
        self.database.set(path, value, WritePolicy::Append)
    }

    /// Directory the current job writes its artifacts to.
    pub fn job_dir(&self) -> ConfigResult<PathBuf> {
        self.database
            .get_as(&format!("{}.job_dir", INTERNAL_NAMESPACE))
    }

    /// Logging hook, tagged with the tool name.
    pub fn log(&self, level: Level, message: &str) {
        let tool = self.name();
        match level {
            Level::ERROR => error!(tool = %tool, "{}", message),
            Level::WARN => warn!(tool = %tool, "{}", message),
            Level::INFO => info!(tool = %tool, "{}", message),
            Level::DEBUG => debug!(tool = %tool, "{}", message),
            _ => trace!(tool = %tool, "{}", message),
        }
    }
}
