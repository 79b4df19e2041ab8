//! Release command implementation.

use std::path::Path;

use miette::Result;

use comfyport_core::config::PackConfig;
use comfyport_core::version::read_version;
use comfyport_ops::github::GitHubClient;
use comfyport_ops::ops_release;
use comfyport_util::errors::PortableError;
use comfyport_util::progress::status_info;

pub fn exec(project_dir: &Path, dist: Option<&Path>) -> Result<()> {
    let config = PackConfig::load(project_dir)?;
    let version = read_version(&config.version_path(project_dir))?;
    let dist = dist
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output_dir(project_dir));

    let targets = ops_release::parse_targets(&config.github.release_targets)?;
    let assets = ops_release::collect_release_assets(
        &dist,
        &config.package.archive_prefix,
        &version,
        &targets,
    )?;

    let client = GitHubClient::from_env(&config.github, project_dir, None)?;
    let rt = tokio::runtime::Runtime::new().map_err(PortableError::Io)?;
    let report = rt.block_on(ops_release::publish_release(&client, &version, &assets))?;

    if !report.replaced.is_empty() {
        status_info("Replaced", &report.replaced.join(", "));
    }
    println!("{}", report.url);
    Ok(())
}
