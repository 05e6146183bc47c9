//! Toolbox CLI - runs a job of configured tools.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use toolbox_scheduler::ToolboxParams;
use tracing::{debug, error, info, warn};

mod commands;
mod logging;
mod tools;

use logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "toolbox")]
#[command(about = "Run a job of configured tools", long_about = None)]
struct Cli {
    /// Job to run, as named under `jobs` in the configuration
    job: String,

    /// Tool manifest listing tool directories
    #[arg(short, long, default_value = "tools.yml")]
    tools: PathBuf,

    /// Build directory; each job writes to a subdirectory named after it
    #[arg(short, long, default_value = "build")]
    build_dir: PathBuf,

    /// Create a symlink at this path pointing to the job directory
    #[arg(long)]
    symlink: Option<PathBuf>,

    /// Configuration file, may be repeated; later files override earlier ones
    #[arg(short, long = "config")]
    configs: Vec<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log file name, created in the build directory
    #[arg(short, long, default_value = "toolbox.log")]
    output: String,

    /// Toolbox home directory
    #[arg(long, env = "TOOLBOX_HOME")]
    home: Option<PathBuf>,
}

impl Cli {
    fn log_file(&self) -> PathBuf {
        self.build_dir.join(&self.output)
    }

    fn job_dir(&self) -> PathBuf {
        self.build_dir.join(&self.job)
    }

    fn params(&self) -> std::io::Result<ToolboxParams> {
        let home_dir = match &self.home {
            Some(home) => home.clone(),
            None => std::env::current_dir()?,
        };
        Ok(ToolboxParams {
            job: self.job.clone(),
            tools_manifest: self.tools.clone(),
            build_dir: self.build_dir.clone(),
            symlink: self.symlink.clone(),
            configs: self.configs.clone(),
            home_dir,
        })
    }
}

/// Copy the log into the job directory, if the run got far enough to create it.
fn copy_log(log_file: &Path, job_dir: &Path) {
    if !job_dir.is_dir() {
        debug!(job_dir = %job_dir.display(), "No job directory, leaving log in place");
        return;
    }
    let Some(name) = log_file.file_name() else {
        return;
    };
    if let Err(e) = fs::copy(log_file, job_dir.join(name)) {
        warn!(error = %e, "Failed to copy log file into job directory");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_file = cli.log_file();

    if let Err(e) = logging::init(cli.log_level, &log_file) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    let result = cli
        .params()
        .map_err(anyhow::Error::from)
        .and_then(|params| commands::run::run(params, tools::registry()));

    let code = match result {
        Ok(summary) => {
            info!(job = %summary.job, run_id = %summary.run_id, "Run finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Run failed");
            ExitCode::FAILURE
        }
    };

    copy_log(&log_file, &cli.job_dir());
    code
}
