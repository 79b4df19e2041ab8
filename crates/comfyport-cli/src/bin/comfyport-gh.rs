//! `comfyport-gh`: dispatch the CI build workflow, wait for it, and download
//! its artifacts.
//!
//! Settings not given on the command line come from the `[github]` table of
//! the nearest `comfyport.toml`, or its defaults when there is none.

use std::path::PathBuf;

use clap::Parser;
use miette::Result;

use comfyport_core::config::PackConfig;
use comfyport_ops::github::GitHubClient;
use comfyport_ops::ops_workflow::{self, PollPolicy};
use comfyport_util::errors::PortableError;
use comfyport_util::progress::status;

#[derive(Parser, Debug)]
#[command(
    name = "comfyport-gh",
    version,
    about = "Trigger the comfyport CI workflow and collect its artifacts"
)]
struct GhCli {
    /// Workflow file name or id (default: [github].workflow, else build.yml)
    #[arg(long)]
    workflow: Option<String>,

    /// Branch to run the workflow on
    #[arg(long, default_value = "main")]
    branch: String,

    /// Directory the artifacts are unpacked into, one subdirectory each
    #[arg(long, default_value = "./artifacts")]
    output_dir: PathBuf,

    /// Repository as owner/name (default: config, GITHUB_REPOSITORY, then the origin remote)
    #[arg(long, value_name = "OWNER/NAME")]
    repo: Option<String>,

    /// Give up waiting for the run after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Seconds between status polls
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Project root holding comfyport.toml
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = GhCli::parse();

    let default_filter = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    run(args)
}

fn run(args: GhCli) -> Result<()> {
    let cwd = std::env::current_dir().map_err(PortableError::Io)?;
    let project_dir = match args.project_dir.as_deref() {
        Some(dir) => comfyport_ops::find_project_dir(Some(dir), &cwd)?,
        None => comfyport_ops::find_project_dir(None, &cwd).unwrap_or_else(|_| cwd.clone()),
    };
    let config = PackConfig::load(&project_dir)?;

    let workflow = args.workflow.unwrap_or_else(|| config.github.workflow.clone());
    let policy = PollPolicy::from_secs(
        args.interval.unwrap_or(config.github.poll_interval_secs),
        args.timeout.unwrap_or(config.github.timeout_secs),
    );
    let output_dir = if args.output_dir.is_absolute() {
        args.output_dir
    } else {
        cwd.join(args.output_dir)
    };

    let client = GitHubClient::from_env(&config.github, &project_dir, args.repo.as_deref())?;

    let rt = tokio::runtime::Runtime::new().map_err(PortableError::Io)?;
    let downloaded = rt.block_on(async {
        let run_id = ops_workflow::trigger_workflow(&client, &workflow, &args.branch).await?;
        ops_workflow::wait_for_run(&client, run_id, policy).await?;
        ops_workflow::download_artifacts(&client, run_id, &output_dir).await
    })?;

    for dir in &downloaded {
        status("Artifact", &dir.display().to_string());
    }
    Ok(())
}
