//! Tools built into the `toolbox` binary.

pub mod dump;

use toolbox_scheduler::{Tool, ToolRegistry};

pub use dump::Dump;

/// Registry with every built-in tool.
pub fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register("Dump", |ctx| {
        Ok(Box::new(Dump::from_context(ctx)?) as Box<dyn Tool>)
    });
    registry
}
