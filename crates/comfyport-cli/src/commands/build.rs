//! Build command implementation.

use std::path::Path;

use miette::Result;

use comfyport_core::config::PackConfig;
use comfyport_ops::github::GitHubClient;
use comfyport_ops::ops_build::{BuildMode, BuildOptions};
use comfyport_ops::{ops_build, ops_push, ops_workflow};
use comfyport_util::errors::PortableError;

use crate::cli::Cli;

pub fn exec(project_dir: &Path, cli: &Cli) -> Result<()> {
    let opts = BuildOptions {
        mode: if cli.ci { BuildMode::Ci } else { BuildMode::Local },
        target: cli.target,
        installer: cli.installer.clone(),
        verbose: cli.verbose,
    };

    let result = ops_build::build(project_dir, &opts)?;
    // Archive path on stdout for CI steps that upload it.
    println!("{}", result.archive.path.display());

    if cli.push {
        ops_push::push(project_dir)?;
    }

    if cli.trigger_workflow {
        trigger(project_dir)?;
    }

    Ok(())
}

fn trigger(project_dir: &Path) -> Result<()> {
    let config = PackConfig::load(project_dir)?;
    let branch = ops_push::current_branch(project_dir)?;
    let client = GitHubClient::from_env(&config.github, project_dir, None)?;

    let rt = tokio::runtime::Runtime::new().map_err(PortableError::Io)?;
    let run_id = rt.block_on(ops_workflow::trigger_workflow(
        &client,
        &config.github.workflow,
        &branch,
    ))?;
    tracing::info!("Dispatched {} run {run_id}", config.github.workflow);
    Ok(())
}
