//! Writes selected parts of the resolved namespace to a YAML file.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Component, Path};
use toolbox_config::{NamespaceStore, WritePolicy};
use toolbox_scheduler::{Step, Tool, ToolContext};
use tracing::Level;

#[derive(Debug, Clone)]
pub struct Dump {
    output: String,
    namespaces: Vec<String>,
}

impl Dump {
    pub fn from_context(ctx: &ToolContext<'_>) -> Result<Self> {
        let output: String = ctx.property_as("output")?;
        let inside_job_dir = Path::new(&output)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !inside_job_dir {
            bail!("Dump output '{}' must be a path inside the job directory", output);
        }
        Ok(Self {
            output,
            namespaces: ctx.property_as("namespaces")?,
        })
    }

    fn collect(&self, ctx: &ToolContext<'_>) -> Result<NamespaceStore> {
        let mut dump = NamespaceStore::new();
        for namespace in &self.namespaces {
            let value = ctx
                .get(namespace)
                .with_context(|| format!("Cannot dump namespace '{}'", namespace))?;
            dump.set(namespace, value.clone(), WritePolicy::Overwrite)?;
        }
        Ok(dump)
    }

    fn write(&self, ctx: &mut ToolContext<'_>) -> Result<()> {
        let dump = self.collect(ctx)?;
        let path = ctx.job_dir()?.join(&self.output);
        let contents = serde_yaml::to_string(&dump).context("Failed to serialize dump")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        ctx.log(
            Level::INFO,
            &format!(
                "Wrote {} namespace(s) to {}",
                self.namespaces.len(),
                path.display()
            ),
        );
        Ok(())
    }
}

impl Tool for Dump {
    fn steps(&self) -> Vec<Step<'_>> {
        vec![Step::new("write", move |ctx| self.write(ctx))]
    }
}
