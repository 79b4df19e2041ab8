//! Operation: clone the application and every plugin of the manifest into
//! the staging directory.

use std::path::Path;

use comfyport_core::config::{ApplicationConfig, FetchConfig, PluginFailurePolicy};
use comfyport_core::layout::StagingLayout;
use comfyport_core::manifest::{PluginEntry, PluginManifest};
use comfyport_util::errors::PortableError;
use comfyport_util::process::CommandBuilder;
use comfyport_util::progress::{spinner, status, status_warn};

/// Outcome of a fetch.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Plugins cloned, in manifest order.
    pub cloned: Vec<String>,
    /// Plugins left out under [`PluginFailurePolicy::Skip`].
    pub skipped: Vec<SkippedPlugin>,
}

#[derive(Debug)]
pub struct SkippedPlugin {
    pub name: String,
    pub url: String,
    pub reason: String,
}

/// Clone the application into `layout.app_dir()` and each plugin into
/// `layout.plugin_dir(name)`.
///
/// The application clone is always fatal on failure. Plugin failures follow
/// `fetch.on_plugin_failure`.
pub fn fetch(
    layout: &StagingLayout,
    application: &ApplicationConfig,
    manifest: &PluginManifest,
    fetch: &FetchConfig,
) -> miette::Result<FetchReport> {
    let sp = spinner(&format!("Cloning {}...", layout.app_dir_name()));
    let result = clone_repo(
        &application.repository,
        application.git_ref.as_deref(),
        &layout.app_dir(),
        fetch.shallow,
    );
    sp.finish_and_clear();
    result?;
    status("Cloned", &format!("{} ({})", layout.app_dir_name(), application.repository));

    comfyport_util::fs::ensure_dir(&layout.custom_nodes_dir()).map_err(PortableError::Io)?;

    let mut report = FetchReport::default();
    for plugin in &manifest.plugins {
        let dest = layout.plugin_dir(&plugin.name);
        let sp = spinner(&format!("Cloning {}...", plugin.name));
        let result = clone_plugin(plugin, &dest, fetch.shallow);
        sp.finish_and_clear();

        match result {
            Ok(()) => {
                status("Cloned", &plugin.name);
                report.cloned.push(plugin.name.clone());
            }
            Err(e) => match fetch.on_plugin_failure {
                PluginFailurePolicy::Abort => return Err(e.into()),
                PluginFailurePolicy::Skip => {
                    status_warn("Skipped", &format!("{} ({})", plugin.name, plugin.url));
                    tracing::warn!("Plugin {} failed to clone: {e}", plugin.name);
                    if let Err(rm) = comfyport_util::fs::remove_path(&dest) {
                        tracing::warn!("Failed to remove partial clone {}: {rm}", dest.display());
                    }
                    report.skipped.push(SkippedPlugin {
                        name: plugin.name.clone(),
                        url: plugin.url.clone(),
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    Ok(report)
}

fn clone_plugin(plugin: &PluginEntry, dest: &Path, shallow: bool) -> Result<(), PortableError> {
    clone_repo(&plugin.url, plugin.git_ref.as_deref(), dest, shallow).map_err(|e| match e {
        PortableError::ExternalTool {
            status, output, ..
        } => PortableError::ExternalTool {
            tool: format!("git clone of plugin '{}' from {}", plugin.name, plugin.url),
            status,
            output,
        },
        other => other,
    })
}

/// Clone `url` into `dest`, checking out `git_ref` when given.
///
/// Branches and tags go through `--branch`, which allows a shallow clone.
/// Commit hashes need the full history before `git checkout`.
pub fn clone_repo(
    url: &str,
    git_ref: Option<&str>,
    dest: &Path,
    shallow: bool,
) -> Result<(), PortableError> {
    let commit = git_ref.filter(|r| is_commit_hash(r));

    let mut cmd = CommandBuilder::new("git").arg("clone");
    if shallow && commit.is_none() {
        cmd = cmd.args(["--depth", "1"]);
    }
    if let Some(branch) = git_ref.filter(|_| commit.is_none()) {
        cmd = cmd.args(["--branch", branch]);
    }
    cmd.arg(url)
        .arg(dest.to_string_lossy())
        .env("GIT_TERMINAL_PROMPT", "0")
        .run()?;

    if let Some(commit) = commit {
        CommandBuilder::new("git")
            .args(["checkout", "--quiet", commit])
            .cwd(dest)
            .run()?;
    }
    Ok(())
}

/// Whether a ref looks like an abbreviated or full commit hash.
pub fn is_commit_hash(git_ref: &str) -> bool {
    (7..=40).contains(&git_ref.len()) && git_ref.chars().all(|c| c.is_ascii_hexdigit())
}
