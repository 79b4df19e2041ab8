//! High-level operations behind the `comfyport` and `comfyport-gh` binaries.

pub mod github;
pub mod ops_archive;
pub mod ops_build;
pub mod ops_fetch;
pub mod ops_launcher;
pub mod ops_push;
pub mod ops_release;
pub mod ops_workflow;

use std::path::{Path, PathBuf};

use comfyport_util::errors::PortableError;

/// Files whose presence marks a project root.
pub const PROJECT_MARKERS: [&str; 2] = [comfyport_core::CONFIG_FILE, "version.txt"];

/// Resolve the project root: `explicit` when given, otherwise the nearest
/// ancestor of `cwd` holding `comfyport.toml` or `version.txt`.
pub fn find_project_dir(explicit: Option<&Path>, cwd: &Path) -> miette::Result<PathBuf> {
    if let Some(dir) = explicit {
        if !dir.is_dir() {
            return Err(PortableError::ConfigMissing {
                what: format!("project directory {}", dir.display()),
            }
            .into());
        }
        return Ok(dir.to_path_buf());
    }
    comfyport_util::fs::find_ancestor_with(cwd, &PROJECT_MARKERS).ok_or_else(|| {
        PortableError::ConfigMissing {
            what: format!(
                "project root (no {} or version.txt in {} or its parents)",
                comfyport_core::CONFIG_FILE,
                cwd.display()
            ),
        }
        .into()
    })
}
