//! Paths inside the staged package directory.
//!
//! ```text
//! anymatix/
//! ├── python/                  portable interpreter (Miniforge prefix)
//! ├── ComfyUI/                 application clone
//! │   └── custom_nodes/<name>  plugin clones
//! └── anymatix_comfyui_<os>    launcher
//! ```

use std::path::{Path, PathBuf};

use crate::config::PackConfig;
use crate::target::{BuildTarget, Os};

/// Directory holding the portable interpreter, relative to the package root.
pub const PYTHON_DIR: &str = "python";

/// Plugin directory, relative to the application clone.
pub const CUSTOM_NODES_DIR: &str = "custom_nodes";

/// Resolved paths for one staged package.
#[derive(Debug, Clone)]
pub struct StagingLayout {
    root: PathBuf,
    app_dir_name: String,
}

impl StagingLayout {
    pub fn new(root: impl Into<PathBuf>, app_dir_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            app_dir_name: app_dir_name.into(),
        }
    }

    /// Layout under `<output-dir>/<product-dir>` for a project.
    pub fn for_project(config: &PackConfig, project_dir: &Path) -> Self {
        Self::new(
            config.output_dir(project_dir).join(&config.package.product_dir),
            config.application.dir_name.clone(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn python_dir(&self) -> PathBuf {
        self.root.join(PYTHON_DIR)
    }

    pub fn app_dir_name(&self) -> &str {
        &self.app_dir_name
    }

    pub fn app_dir(&self) -> PathBuf {
        self.root.join(&self.app_dir_name)
    }

    pub fn custom_nodes_dir(&self) -> PathBuf {
        self.app_dir().join(CUSTOM_NODES_DIR)
    }

    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.custom_nodes_dir().join(name)
    }

    pub fn launcher_path(&self, target: &BuildTarget) -> PathBuf {
        self.root.join(launcher_file_name(target))
    }
}

/// File name of the launcher script for a target.
pub fn launcher_file_name(target: &BuildTarget) -> &'static str {
    match target.os {
        Os::MacOs => "anymatix_comfyui_macos",
        Os::Linux => "anymatix_comfyui_linux",
        Os::Windows => "anymatix_comfyui_windows.bat",
    }
}

/// Interpreter path relative to the package root, with the target's separator.
pub fn interpreter_rel_path(target: &BuildTarget) -> &'static str {
    if target.is_windows() {
        r"python\python.exe"
    } else {
        "python/bin/python"
    }
}
