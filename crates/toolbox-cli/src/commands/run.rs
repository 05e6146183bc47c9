//! Job execution command.

use anyhow::{Context, Result};
use toolbox_scheduler::{JobSummary, OrchestratorError, ToolRegistry, Toolbox, ToolboxParams};

/// Set up the namespace for `params.job` and run all of its tasks.
pub fn run(params: ToolboxParams, registry: ToolRegistry) -> Result<JobSummary> {
    let job = params.job.clone();
    let mut toolbox = Toolbox::new(params, registry)
        .with_context(|| format!("Failed to set up job '{}'", job))?;

    println!("Running job: {}", job);
    println!("Run ID: {}", toolbox.run_id());
    println!("Tasks: {}", toolbox.tasks().len());

    let summary = match toolbox.execute() {
        Ok(summary) => summary,
        Err(e) => {
            if let OrchestratorError::TaskFailed { summary, .. } = &e {
                print_tasks(summary);
            }
            return Err(e).with_context(|| format!("Job '{}' failed", job));
        }
    };

    print_tasks(&summary);
    println!("Job directory: {}", summary.job_dir.display());
    Ok(summary)
}

fn print_tasks(summary: &JobSummary) {
    for task in &summary.tasks {
        let mark = if task.state.is_success() { "✓" } else { "✗" };
        println!("{} [{}] {} ({})", mark, task.index, task.tool, task.state.label());
    }
}
