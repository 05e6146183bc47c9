//! Tool dispatch table.

use std::collections::HashMap;
use std::fmt;

use crate::tool::{Tool, ToolContext};

/// Builds a tool instance from its validated context.
pub type ToolFactory = Box<dyn Fn(&ToolContext<'_>) -> anyhow::Result<Box<dyn Tool>>>;

/// Maps tool names to the factories that implement them.
///
/// A tool whose descriptor is loaded but that has no entry here cannot be
/// run.
#[derive(Default)]
pub struct ToolRegistry {
    factories: HashMap<String, ToolFactory>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one under the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ToolContext<'_>) -> anyhow::Result<Box<dyn Tool>> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolFactory> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
