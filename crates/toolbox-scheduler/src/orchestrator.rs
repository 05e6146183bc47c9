//! Job orchestrator - loads tools and configuration, then runs the tasks of a
//! job in declaration order.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use toolbox_config::{
    ConfigError, Database, JsonSchemaValidator, SchemaValidator, load_yaml_file, with_includes,
};
use toolbox_core::job::parse_tasks;
use toolbox_core::{RunId, TaskSpec, TaskState, ToolDescriptor};
use tracing::{debug, error, info};

use crate::registry::ToolRegistry;
use crate::tool::ToolContext;
use crate::{OrchestratorError, OrchestratorResult};

/// Top-level key reserved for bookkeeping.
pub const INTERNAL_NAMESPACE: &str = "internal";

/// Descriptor file expected in every tool directory.
pub const TOOL_DESCRIPTOR_FILE: &str = "tool.yml";

/// Everything needed to set up a run.
#[derive(Debug, Clone)]
pub struct ToolboxParams {
    /// Job to run, looked up under `jobs.<job>`.
    pub job: String,
    /// YAML manifest listing tool directories.
    pub tools_manifest: PathBuf,
    pub build_dir: PathBuf,
    /// Where to place a symlink to the job directory.
    pub symlink: Option<PathBuf>,
    /// Configuration files, merged in order.
    pub configs: Vec<PathBuf>,
    pub home_dir: PathBuf,
}

/// A tool descriptor together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedTool {
    pub descriptor: ToolDescriptor,
    pub path: PathBuf,
    /// This tool followed by every tool it inherits from, depth-first.
    pub lineage: Vec<String>,
}

/// Final state of one task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub index: usize,
    pub tool: String,
    pub state: TaskState,
}

/// Result of a job execution.
#[derive(Debug)]
pub struct JobSummary {
    pub job: String,
    pub run_id: RunId,
    pub job_dir: PathBuf,
    pub tasks: Vec<TaskReport>,
}

impl JobSummary {
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|t| t.state.is_success())
    }
}

/// Coordinates the running of tools for one job.
pub struct Toolbox {
    params: ToolboxParams,
    run_id: RunId,
    job_dir: PathBuf,
    tools: Vec<LoadedTool>,
    tasks: Vec<TaskSpec>,
    registry: ToolRegistry,
    validator: Box<dyn SchemaValidator>,
    /// Every layer merged, markers untouched. Tasks run against this.
    merged: Database,
    /// Best-effort resolved view of `merged`, used to select the job.
    database: Database,
}

impl Toolbox {
    pub fn new(params: ToolboxParams, registry: ToolRegistry) -> OrchestratorResult<Self> {
        Self::with_validator(params, registry, Box::new(JsonSchemaValidator))
    }

    /// Build the global database for a run.
    ///
    /// Bookkeeping goes in first, then tool defaults in manifest order, then
    /// every configuration file in order, each overriding the previous layer.
    /// The merged store is kept unresolved so task configs can still override
    /// keys that other keys reference. A best-effort resolved copy is used to
    /// select the job.
    pub fn with_validator(
        params: ToolboxParams,
        registry: ToolRegistry,
        validator: Box<dyn SchemaValidator>,
    ) -> OrchestratorResult<Self> {
        let run_id = RunId::new();
        let tools = load_tools(&params.tools_manifest)?;
        let job_dir = params.build_dir.join(&params.job);
        info!(
            job = %params.job,
            run_id = %run_id,
            tools = tools.len(),
            "Loaded tool manifest"
        );

        let mut merged = Database::new(INTERNAL_NAMESPACE);
        merged.load_internal(&bookkeeping(&params, &run_id, &job_dir, &tools)?)?;
        for tool in &tools {
            merged.load(&tool.descriptor.defaults())?;
            debug!(tool = %tool.descriptor.name, "Loaded tool defaults");
        }
        for config in &params.configs {
            merged.load(&read_yaml(config)?)?;
            info!(path = %config.display(), "Loaded configuration file");
        }
        let mut database = merged.clone();
        database.resolve(false)?;

        let jobs = match database.get("jobs") {
            Ok(Value::Object(jobs)) => jobs,
            Ok(_) => {
                let message = "'jobs' must be a mapping".to_string();
                return Err(toolbox_core::Error::InvalidJob(message).into());
            }
            Err(ConfigError::KeyNotFound(_)) => return Err(OrchestratorError::NoJobs),
            Err(e) => return Err(e.into()),
        };
        let tasks = match jobs.get(&params.job) {
            Some(value) => parse_tasks(&params.job, value)?,
            None => return Err(OrchestratorError::JobNotFound(params.job.clone())),
        };

        prepare_job_dir(&job_dir, params.symlink.as_deref())?;

        Ok(Self {
            params,
            run_id,
            job_dir,
            tools,
            tasks,
            registry,
            validator,
            merged,
            database,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn job(&self) -> &str {
        &self.params.job
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    pub fn tools(&self) -> &[LoadedTool] {
        &self.tools
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    /// Global namespace with every resolvable reference filled in.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Global namespace as loaded, before any resolution.
    pub fn merged(&self) -> &Database {
        &self.merged
    }

    /// Run every task of the job, stopping at the first failure.
    ///
    /// The merged namespace is restored after each task whether or not it
    /// succeeded, so mutations never carry over from one task to the next.
    /// On failure the returned error carries the reports of every task run so
    /// far, the failed one last.
    pub fn execute(&mut self) -> OrchestratorResult<JobSummary> {
        info!(job = %self.params.job, tasks = self.tasks.len(), "Starting job");

        let tasks = self.tasks.clone();
        let mut reports = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            let mut state = TaskState::Pending;
            info!(task = index, tool = %task.tool, "Running task");

            let result = if self.tool(&task.tool).is_none() {
                Err(OrchestratorError::ToolNotFound(task.tool.clone()))
            } else {
                let snapshot = self.merged.snapshot();
                let result = self.run_task(task, &mut state);
                self.merged.restore(snapshot);
                result
            };

            match result {
                Ok(()) => {
                    state = TaskState::Done;
                    info!(task = index, tool = %task.tool, "Task completed successfully");
                    reports.push(TaskReport {
                        index,
                        tool: task.tool.clone(),
                        state,
                    });
                }
                Err(e) => {
                    error!(
                        task = index,
                        tool = %task.tool,
                        state = state.label(),
                        error = %e,
                        "Task failed"
                    );
                    reports.push(TaskReport {
                        index,
                        tool: task.tool.clone(),
                        state: TaskState::Failed {
                            message: e.to_string(),
                        },
                    });
                    return Err(OrchestratorError::TaskFailed {
                        index,
                        tool: task.tool.clone(),
                        source: Box::new(e),
                        summary: Box::new(self.summary(reports)),
                    });
                }
            }
        }

        info!(job = %self.params.job, "Job completed");
        Ok(self.summary(reports))
    }

    fn summary(&self, tasks: Vec<TaskReport>) -> JobSummary {
        JobSummary {
            job: self.params.job.clone(),
            run_id: self.run_id,
            job_dir: self.job_dir.clone(),
            tasks,
        }
    }

    fn tool(&self, name: &str) -> Option<&LoadedTool> {
        find_tool(&self.tools, name)
    }

    /// Everything between the snapshot and the restore.
    fn run_task(&mut self, task: &TaskSpec, state: &mut TaskState) -> OrchestratorResult<()> {
        let tool = find_tool(&self.tools, &task.tool)
            .ok_or_else(|| OrchestratorError::ToolNotFound(task.tool.clone()))?;

        for config in &task.configs {
            self.merged.load(&read_yaml(config)?)?;
            debug!(tool = %task.tool, path = %config.display(), "Loaded task configuration");
        }
        *state = TaskState::ConfigLoaded;

        self.merged.resolve(true)?;
        *state = TaskState::Resolved;

        let factory = self
            .registry
            .get(&task.tool)
            .ok_or_else(|| OrchestratorError::NotATool(task.tool.clone()))?;
        validate_lineage(self.validator.as_ref(), &self.tools, tool, &self.merged)?;

        let mut ctx = ToolContext::new(&tool.descriptor, &mut self.merged);
        let instance = factory(&ctx).map_err(|source| OrchestratorError::ToolConstruction {
            tool: task.tool.clone(),
            source,
        })?;
        *state = TaskState::ToolInstantiated;

        for step in instance.steps() {
            let name = step.name().to_string();
            debug!(tool = %task.tool, step = %name, "Running step");
            *state = TaskState::StepsRunning { step: name.clone() };
            step.run(&mut ctx)
                .map_err(|source| OrchestratorError::StepFailed {
                    tool: task.tool.clone(),
                    step: name,
                    source,
                })?;
        }
        Ok(())
    }
}

fn find_tool<'a>(tools: &'a [LoadedTool], name: &str) -> Option<&'a LoadedTool> {
    tools.iter().find(|t| t.descriptor.name == name)
}

fn read_yaml(path: &Path) -> OrchestratorResult<Map<String, Value>> {
    load_yaml_file(path).map_err(|e| match e {
        ConfigError::MissingFile(path) => OrchestratorError::MissingRequiredFile(path),
        other => other.into(),
    })
}

/// Read the tool manifest and every descriptor it lists.
fn load_tools(manifest: &Path) -> OrchestratorResult<Vec<LoadedTool>> {
    let contents = read_yaml(manifest)?;
    let dirs: Vec<PathBuf> = match contents.get("tools") {
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            OrchestratorError::InvalidManifest {
                path: manifest.to_path_buf(),
                message: format!("'tools' must be a list of directories: {}", e),
            }
        })?,
        None => Vec::new(),
    };
    if dirs.is_empty() {
        return Err(OrchestratorError::NoTools(manifest.to_path_buf()));
    }

    let base = manifest.parent().unwrap_or_else(|| Path::new("."));
    let mut tools: Vec<LoadedTool> = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let path = base.join(dir);
        let descriptor_path = path.join(TOOL_DESCRIPTOR_FILE);
        let descriptor: ToolDescriptor = serde_json::from_value(Value::Object(read_yaml(
            &descriptor_path,
        )?))
        .map_err(|e| {
            toolbox_core::Error::InvalidDescriptor(format!("{}: {}", descriptor_path.display(), e))
        })?;
        descriptor.validate()?;

        if find_tool(&tools, &descriptor.name).is_some() {
            return Err(OrchestratorError::DuplicateToolName(descriptor.name));
        }
        debug!(tool = %descriptor.name, path = %path.display(), "Loaded tool descriptor");
        tools.push(LoadedTool {
            descriptor,
            path,
            lineage: Vec::new(),
        });
    }

    let lineages = tools
        .iter()
        .map(|tool| lineage(&tool.descriptor.name, &tools))
        .collect::<OrchestratorResult<Vec<_>>>()?;
    for (tool, lineage) in tools.iter_mut().zip(lineages) {
        tool.lineage = lineage;
    }
    Ok(tools)
}

/// Flatten the inheritance graph of `name` into an ordered, de-duplicated list.
fn lineage(name: &str, tools: &[LoadedTool]) -> OrchestratorResult<Vec<String>> {
    let mut lineage = Vec::new();
    let mut stack = Vec::new();
    visit(name, tools, &mut stack, &mut lineage)?;
    Ok(lineage)
}

fn visit(
    name: &str,
    tools: &[LoadedTool],
    stack: &mut Vec<String>,
    lineage: &mut Vec<String>,
) -> OrchestratorResult<()> {
    if stack.iter().any(|n| n == name) {
        stack.push(name.to_string());
        return Err(OrchestratorError::InheritanceCycle(stack.join(" -> ")));
    }
    if lineage.iter().any(|n| n == name) {
        return Ok(());
    }
    let Some(tool) = find_tool(tools, name) else {
        return Err(OrchestratorError::ToolNotFound(name.to_string()));
    };

    lineage.push(name.to_string());
    stack.push(name.to_string());
    for parent in &tool.descriptor.inherits {
        if find_tool(tools, parent).is_none() {
            return Err(OrchestratorError::UnknownParent {
                tool: name.to_string(),
                parent: parent.clone(),
            });
        }
        visit(parent, tools, stack, lineage)?;
    }
    stack.pop();
    Ok(())
}

/// Check every property of every namespace `tool` owns against its schema.
fn validate_lineage(
    validator: &dyn SchemaValidator,
    tools: &[LoadedTool],
    tool: &LoadedTool,
    database: &Database,
) -> OrchestratorResult<()> {
    for name in &tool.lineage {
        let owner = find_tool(tools, name)
            .ok_or_else(|| OrchestratorError::ToolNotFound(name.clone()))?;
        for property in &owner.descriptor.properties {
            let path = owner.descriptor.property_path(&property.name);
            let schema_error = |message: String| OrchestratorError::SchemaValidation {
                path: path.clone(),
                description: property.description.clone(),
                message,
            };

            let value = match database.get(&path) {
                Ok(value) => value,
                Err(ConfigError::KeyNotFound(_) | ConfigError::TypeNotTraversable { .. }) => {
                    return Err(schema_error("missing required property".to_string()));
                }
                Err(e) => return Err(e.into()),
            };
            let schema = with_includes(&property.schema, &owner.descriptor.includes);
            validator.validate(value, &schema).map_err(schema_error)?;
        }
        debug!(tool = %tool.descriptor.name, namespace = %owner.descriptor.namespace(), "Namespace validated");
    }
    Ok(())
}

/// Bookkeeping written under the internal namespace.
fn bookkeeping(
    params: &ToolboxParams,
    run_id: &RunId,
    job_dir: &Path,
    tools: &[LoadedTool],
) -> OrchestratorResult<Map<String, Value>> {
    let work_dir = std::env::current_dir()?;
    let started_at = run_id
        .started_at()
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut tool_entries = Map::new();
    for tool in tools {
        tool_entries.insert(
            tool.descriptor.name.clone(),
            json!({
                "path": tool.path.display().to_string(),
                "namespace": tool.descriptor.namespace(),
            }),
        );
    }

    let mut internal = Map::new();
    internal.insert(
        "home_dir".to_string(),
        json!(params.home_dir.display().to_string()),
    );
    internal.insert("work_dir".to_string(), json!(work_dir.display().to_string()));
    internal.insert(
        "build_dir".to_string(),
        json!(params.build_dir.display().to_string()),
    );
    internal.insert("job_dir".to_string(), json!(job_dir.display().to_string()));
    internal.insert(
        "job".to_string(),
        json!({
            "name": params.job,
            "run_id": run_id.to_string(),
            "started_at": started_at,
        }),
    );
    internal.insert("tools".to_string(), Value::Object(tool_entries));

    let mut root = Map::new();
    root.insert(INTERNAL_NAMESPACE.to_string(), Value::Object(internal));
    Ok(root)
}

fn prepare_job_dir(job_dir: &Path, symlink: Option<&Path>) -> OrchestratorResult<()> {
    fs::create_dir_all(job_dir)?;
    if let Some(link) = symlink {
        link_job_dir(job_dir, link)?;
    }
    Ok(())
}

#[cfg(unix)]
fn link_job_dir(job_dir: &Path, link: &Path) -> io::Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(link)?,
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a symlink", link.display()),
            ));
        }
        Err(_) => {}
    }
    let target = job_dir.canonicalize()?;
    std::os::unix::fs::symlink(&target, link)?;
    info!(link = %link.display(), target = %target.display(), "Linked job directory");
    Ok(())
}

#[cfg(not(unix))]
fn link_job_dir(_job_dir: &Path, link: &Path) -> io::Result<()> {
    tracing::warn!(link = %link.display(), "Symlinks are not supported on this platform");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Step, Tool};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    const WRITER_YML: &str = r##"
name: Writer
namespace: writer
includes:
  text: {type: string, minLength: 1}
properties:
  - name: target
    description: Key the tool writes
    default: scratch.note
    schema: {type: string}
  - name: greeting
    description: Greeting text
    schema: {"$ref": "#/$defs/text"}
"##;

    const CHILD_YML: &str = r#"
name: Child
namespace: child
inherits: [Writer]
properties:
  - name: level
    description: Verbosity level
    default: 1
    schema: {type: integer}
"#;

    const CONFIG: &str = r#"
writer:
  greeting: hi
jobs:
  build: [Writer]
  broken: [Broken]
  child: [Child]
  orphan: [Orphan]
  missing: [Nope]
"#;

    struct Writer {
        target: String,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl Tool for Writer {
        fn steps(&self) -> Vec<Step<'_>> {
            vec![
                Step::new("record", move |ctx| {
                    let greeting: String = ctx.property_as("greeting")?;
                    self.seen.borrow_mut().push(greeting);
                    Ok(())
                }),
                Step::new("write", move |ctx| {
                    ctx.set(&self.target, json!("written"))?;
                    ctx.set_property("greeting", json!("changed"))?;
                    Ok(())
                }),
            ]
        }
    }

    struct Broken;

    impl Tool for Broken {
        fn steps(&self) -> Vec<Step<'_>> {
            vec![
                Step::new("scribble", |ctx| {
                    ctx.set("scratch.broken", json!(true))?;
                    Ok(())
                }),
                Step::new("explode", |_| Err(anyhow::anyhow!("boom"))),
            ]
        }
    }

    struct Noop;

    impl Tool for Noop {
        fn steps(&self) -> Vec<Step<'_>> {
            Vec::new()
        }
    }

    struct Fixture {
        dir: TempDir,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let fixture = Self {
                dir: TempDir::new().unwrap(),
                seen: Rc::default(),
            };
            fixture.write("tools/writer/tool.yml", WRITER_YML);
            fixture.write("tools/broken/tool.yml", "name: Broken\n");
            fixture.write("tools/child/tool.yml", CHILD_YML);
            fixture.write("tools/orphan/tool.yml", "name: Orphan\n");
            fixture.write(
                "tools.yml",
                "tools: [tools/writer, tools/broken, tools/child, tools/orphan]\n",
            );
            fixture.write("config.yml", CONFIG);
            fixture
        }

        fn write(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            path
        }

        fn params(&self, manifest: &str, job: &str, configs: &[&str]) -> ToolboxParams {
            ToolboxParams {
                job: job.to_string(),
                tools_manifest: self.dir.path().join(manifest),
                build_dir: self.dir.path().join("build"),
                symlink: None,
                configs: configs.iter().map(|c| self.dir.path().join(c)).collect(),
                home_dir: self.dir.path().to_path_buf(),
            }
        }

        fn registry(&self) -> ToolRegistry {
            let mut registry = ToolRegistry::new();
            let seen = Rc::clone(&self.seen);
            registry
                .register("Writer", move |ctx| {
                    Ok(Box::new(Writer {
                        target: ctx.property_as("target")?,
                        seen: Rc::clone(&seen),
                    }) as Box<dyn Tool>)
                })
                .register("Broken", |_| Ok(Box::new(Broken) as Box<dyn Tool>))
                .register("Child", |_| Ok(Box::new(Noop) as Box<dyn Tool>));
            registry
        }

        fn toolbox(&self, job: &str, configs: &[&str]) -> OrchestratorResult<Toolbox> {
            Toolbox::new(self.params("tools.yml", job, configs), self.registry())
        }

        fn failure(&self, job: &str, configs: &[&str]) -> OrchestratorError {
            let mut toolbox = self.toolbox(job, configs).unwrap();
            match toolbox.execute() {
                Err(OrchestratorError::TaskFailed { source, .. }) => *source,
                other => panic!("expected task failure, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_executes_job_and_restores_namespace() {
        let fixture = Fixture::new();
        let mut toolbox = fixture.toolbox("build", &["config.yml"]).unwrap();

        let summary = toolbox.execute().unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.tasks.len(), 1);
        assert_eq!(summary.tasks[0].state, TaskState::Done);
        assert_eq!(summary.run_id, toolbox.run_id());

        assert_eq!(*fixture.seen.borrow(), vec!["hi"]);
        assert_eq!(toolbox.merged().get("writer.greeting").unwrap(), &json!("hi"));
        assert!(!toolbox.merged().contains("scratch.note"));
    }

    #[test]
    fn test_task_configs_do_not_leak_between_tasks() {
        let fixture = Fixture::new();
        let extra = fixture.write("extra.yml", "writer:\n  greeting: task\n");
        fixture.write(
            "scoped.yml",
            &format!(
                "writer:\n  greeting: hi\njobs:\n  build:\n    - tool: Writer\n      configs: [\"{}\"]\n    - Writer\n",
                extra.display()
            ),
        );

        let mut toolbox = fixture.toolbox("build", &["scoped.yml"]).unwrap();
        assert_eq!(toolbox.tasks().len(), 2);
        let summary = toolbox.execute().unwrap();

        assert_eq!(summary.tasks.len(), 2);
        assert_eq!(*fixture.seen.borrow(), vec!["task", "hi"]);
        assert_eq!(toolbox.merged().get("writer.greeting").unwrap(), &json!("hi"));
    }

    #[test]
    fn test_task_config_overrides_referenced_key() {
        let fixture = Fixture::new();
        let extra = fixture.write("extra.yml", "greeting_base: task
");
        fixture.write(
            "refs.yml",
            &format!(
                "greeting_base: global
writer:
  greeting: \"${{greeting_base}}-hi\"
jobs:
  build:
    - tool: Writer
      configs: [\"{}\"]
    - Writer
",
                extra.display()
            ),
        );

        let mut toolbox = fixture.toolbox("build", &["refs.yml"]).unwrap();
        assert_eq!(
            toolbox.database().get("writer.greeting").unwrap(),
            &json!("global-hi")
        );
        toolbox.execute().unwrap();

        assert_eq!(*fixture.seen.borrow(), vec!["task-hi", "global-hi"]);
        assert_eq!(
            toolbox.merged().get("writer.greeting").unwrap(),
            &json!("${greeting_base}-hi")
        );
    }

    #[test]
    fn test_failed_step_still_restores() {
        let fixture = Fixture::new();
        let mut toolbox = fixture.toolbox("broken", &["config.yml"]).unwrap();
        let before = toolbox.merged().snapshot();

        match toolbox.execute() {
            Err(OrchestratorError::TaskFailed {
                index, tool, source, ..
            }) => {
                assert_eq!(index, 0);
                assert_eq!(tool, "Broken");
                assert!(matches!(
                    *source,
                    OrchestratorError::StepFailed { ref step, .. } if step == "explode"
                ));
            }
            other => panic!("expected task failure, got {:?}", other),
        }
        assert!(!toolbox.merged().contains("scratch.broken"));
        assert_eq!(toolbox.merged().snapshot(), before);
    }

    #[test]
    fn test_failed_task_is_reported() {
        let fixture = Fixture::new();
        fixture.write("mixed.yml", "jobs:
  mixed: [Writer, Broken, Writer]
");
        let mut toolbox = fixture
            .toolbox("mixed", &["config.yml", "mixed.yml"])
            .unwrap();

        let summary = match toolbox.execute() {
            Err(OrchestratorError::TaskFailed { index, summary, .. }) => {
                assert_eq!(index, 1);
                summary
            }
            other => panic!("expected task failure, got {:?}", other),
        };
        assert!(!summary.is_success());
        assert_eq!(summary.tasks.len(), 2);
        assert_eq!(summary.tasks[0].state, TaskState::Done);

        let failed = &summary.tasks[1];
        assert_eq!(failed.tool, "Broken");
        assert!(failed.state.is_terminal());
        match &failed.state {
            TaskState::Failed { message } => assert!(message.contains("explode"), "{}", message),
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(*fixture.seen.borrow(), vec!["hi"]);
    }

    #[test]
    fn test_schema_violation() {
        let fixture = Fixture::new();
        fixture.write("bad.yml", "writer:\n  greeting: 5\n");
        let err = fixture.failure("build", &["config.yml", "bad.yml"]);
        assert!(matches!(
            err,
            OrchestratorError::SchemaValidation { ref path, .. } if path == "writer.greeting"
        ));

        fixture.write("empty.yml", "writer:\n  greeting: \"\"\n");
        let err = fixture.failure("build", &["config.yml", "empty.yml"]);
        assert!(matches!(err, OrchestratorError::SchemaValidation { .. }));
        assert!(fixture.seen.borrow().is_empty());
    }

    #[test]
    fn test_missing_property() {
        let fixture = Fixture::new();
        fixture.write("jobs.yml", "jobs:\n  build: [Writer]\n");
        match fixture.failure("build", &["jobs.yml"]) {
            OrchestratorError::SchemaValidation {
                path,
                description,
                message,
            } => {
                assert_eq!(path, "writer.greeting");
                assert_eq!(description, "Greeting text");
                assert!(message.contains("missing"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tool_not_found() {
        let fixture = Fixture::new();
        let err = fixture.failure("missing", &["config.yml"]);
        assert!(matches!(err, OrchestratorError::ToolNotFound(ref name) if name == "Nope"));
    }

    #[test]
    fn test_not_a_tool() {
        let fixture = Fixture::new();
        let err = fixture.failure("orphan", &["config.yml"]);
        assert!(matches!(err, OrchestratorError::NotATool(ref name) if name == "Orphan"));
    }

    #[test]
    fn test_inherited_namespaces_are_validated() {
        let fixture = Fixture::new();
        let toolbox = fixture.toolbox("child", &["config.yml"]).unwrap();
        let child = toolbox
            .tools()
            .iter()
            .find(|t| t.descriptor.name == "Child")
            .unwrap();
        assert_eq!(child.lineage, vec!["Child", "Writer"]);

        let mut toolbox = toolbox;
        assert!(toolbox.execute().unwrap().is_success());
        assert_eq!(toolbox.database().get("child.level").unwrap(), &json!(1));

        fixture.write("jobs.yml", "jobs:\n  child: [Child]\n");
        let err = fixture.failure("child", &["jobs.yml"]);
        assert!(matches!(
            err,
            OrchestratorError::SchemaValidation { ref path, .. } if path == "writer.greeting"
        ));
    }

    #[test]
    fn test_inheritance_errors() {
        let fixture = Fixture::new();
        fixture.write("tools/a/tool.yml", "name: A\ninherits: [B]\n");
        fixture.write("tools/b/tool.yml", "name: B\ninherits: [A]\n");
        fixture.write("loop.yml", "tools: [tools/a, tools/b]\n");
        let result = Toolbox::new(
            fixture.params("loop.yml", "build", &["config.yml"]),
            fixture.registry(),
        );
        assert!(matches!(result, Err(OrchestratorError::InheritanceCycle(ref c)) if c == "A -> B -> A"));

        fixture.write("tools/lost/tool.yml", "name: Lost\ninherits: [Nowhere]\n");
        fixture.write("lost.yml", "tools: [tools/lost]\n");
        let result = Toolbox::new(
            fixture.params("lost.yml", "build", &["config.yml"]),
            fixture.registry(),
        );
        assert!(matches!(result, Err(OrchestratorError::UnknownParent { ref parent, .. }) if parent == "Nowhere"));
    }

    #[test]
    fn test_duplicate_tool_names() {
        let fixture = Fixture::new();
        fixture.write("dup.yml", "tools: [tools/writer, tools/writer]\n");
        let result = Toolbox::new(
            fixture.params("dup.yml", "build", &["config.yml"]),
            fixture.registry(),
        );
        assert!(matches!(result, Err(OrchestratorError::DuplicateToolName(ref n)) if n == "Writer"));
    }

    #[test]
    fn test_manifest_errors() {
        let fixture = Fixture::new();
        fixture.write("none.yml", "tools: []\n");
        let result = Toolbox::new(
            fixture.params("none.yml", "build", &["config.yml"]),
            fixture.registry(),
        );
        assert!(matches!(result, Err(OrchestratorError::NoTools(_))));

        let result = Toolbox::new(
            fixture.params("absent.yml", "build", &["config.yml"]),
            fixture.registry(),
        );
        assert!(matches!(result, Err(OrchestratorError::MissingRequiredFile(_))));

        fixture.write("bad.yml", "tools: tools/writer\n");
        let result = Toolbox::new(
            fixture.params("bad.yml", "build", &["config.yml"]),
            fixture.registry(),
        );
        assert!(matches!(result, Err(OrchestratorError::InvalidManifest { .. })));
    }

    #[test]
    fn test_missing_config_file() {
        let fixture = Fixture::new();
        let result = fixture.toolbox("build", &["config.yml", "nonexistent.yml"]);
        assert!(matches!(result, Err(OrchestratorError::MissingRequiredFile(_))));
    }

    #[test]
    fn test_job_selection_errors() {
        let fixture = Fixture::new();
        fixture.write("nojobs.yml", "writer:\n  greeting: hi\n");
        assert!(matches!(
            fixture.toolbox("build", &["nojobs.yml"]),
            Err(OrchestratorError::NoJobs)
        ));
        assert!(matches!(
            fixture.toolbox("deploy", &["config.yml"]),
            Err(OrchestratorError::JobNotFound(ref job)) if job == "deploy"
        ));
    }

    #[test]
    fn test_config_cannot_write_internal_namespace() {
        let fixture = Fixture::new();
        fixture.write("sneaky.yml", "internal:\n  home_dir: /elsewhere\n");
        let result = fixture.toolbox("build", &["config.yml", "sneaky.yml"]);
        assert!(matches!(
            result,
            Err(OrchestratorError::Config(ConfigError::ProtectedNamespace { .. }))
        ));
    }

    #[test]
    fn test_bookkeeping_and_references() {
        let fixture = Fixture::new();
        fixture.write(
            "refs.yml",
            "writer:\n  greeting: \"${internal.job.name}-hi\"\n  target: \"${unknown.path}\"\n",
        );
        let toolbox = fixture.toolbox("build", &["config.yml", "refs.yml"]).unwrap();
        let db = toolbox.database();

        assert_eq!(db.get("writer.greeting").unwrap(), &json!("build-hi"));
        assert_eq!(db.get("writer.target").unwrap(), &json!("${unknown.path}"));
        assert_eq!(db.get("internal.job.name").unwrap(), &json!("build"));
        assert_eq!(
            db.get("internal.job.run_id").unwrap(),
            &json!(toolbox.run_id().to_string())
        );
        assert_eq!(
            db.get("internal.tools.Writer.namespace").unwrap(),
            &json!("writer")
        );
        assert!(toolbox.job_dir().is_dir());
    }

    #[test]
    fn test_strict_resolution_inside_task() {
        let fixture = Fixture::new();
        fixture.write("refs.yml", "writer:\n  target: \"${unknown.path}\"\n");
        let err = fixture.failure("build", &["config.yml", "refs.yml"]);
        assert!(matches!(
            err,
            OrchestratorError::Config(ConfigError::UnresolvedReference(ref r)) if r == "unknown.path"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_job_dir() {
        let fixture = Fixture::new();
        let link = fixture.dir.path().join("latest");
        let mut params = fixture.params("tools.yml", "build", &["config.yml"]);
        params.symlink = Some(link.clone());

        let toolbox = Toolbox::new(params.clone(), fixture.registry()).unwrap();
        let target = fs::read_link(&link).unwrap();
        assert_eq!(target, toolbox.job_dir().canonicalize().unwrap());

        Toolbox::new(params, fixture.registry()).unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    }
}
