use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use comfyport_util::errors::PortableError;

use crate::target::BuildTarget;

/// Project configuration loaded from `comfyport.toml` at the project root.
///
/// Every section and key is optional; an absent file yields the defaults that
/// build the anymatix ComfyUI package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackConfig {
    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub launcher: LauncherConfig,

    #[serde(default)]
    pub github: GitHubConfig,
}

/// Names and input/output paths from `[package]`. Relative paths are
/// resolved against the project directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Top-level directory inside the archive.
    #[serde(default = "default_product_dir", rename = "product-dir")]
    pub product_dir: String,
    #[serde(default = "default_archive_prefix", rename = "archive-prefix")]
    pub archive_prefix: String,
    #[serde(default = "default_version_file", rename = "version-file")]
    pub version_file: String,
    #[serde(default = "default_manifest")]
    pub manifest: String,
    #[serde(default = "default_requirements")]
    pub requirements: String,
    #[serde(default = "default_output_dir", rename = "output-dir")]
    pub output_dir: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            product_dir: default_product_dir(),
            archive_prefix: default_archive_prefix(),
            version_file: default_version_file(),
            manifest: default_manifest(),
            requirements: default_requirements(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_product_dir() -> String {
    "anymatix".to_string()
}

fn default_archive_prefix() -> String {
    "anymatix-portable-comfyui".to_string()
}

fn default_version_file() -> String {
    "version.txt".to_string()
}

fn default_manifest() -> String {
    "repos.json".to_string()
}

fn default_requirements() -> String {
    "requirements.txt".to_string()
}

fn default_output_dir() -> String {
    "dist".to_string()
}

/// The application repository from `[application]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_repo")]
    pub repository: String,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    /// Directory name of the clone inside the product directory.
    #[serde(default = "default_app_dir", rename = "dir-name")]
    pub dir_name: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            repository: default_app_repo(),
            git_ref: None,
            dir_name: default_app_dir(),
        }
    }
}

fn default_app_repo() -> String {
    crate::DEFAULT_APPLICATION_REPO.to_string()
}

fn default_app_dir() -> String {
    "ComfyUI".to_string()
}

/// What to do when a single plugin fails to clone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginFailurePolicy {
    /// Abort the whole build.
    #[default]
    Abort,
    /// Warn, leave the plugin out, and continue.
    Skip,
}

/// Clone behaviour from `[fetch]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_true")]
    pub shallow: bool,
    #[serde(default, rename = "on-plugin-failure")]
    pub on_plugin_failure: PluginFailurePolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            shallow: true,
            on_plugin_failure: PluginFailurePolicy::Abort,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Interpreter and package selection from `[environment]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_miniforge_base", rename = "miniforge-base-url")]
    pub miniforge_base_url: String,
    /// Replaces the built-in overrides entirely when present.
    #[serde(default = "default_overrides")]
    pub overrides: Vec<EnvironmentOverride>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            miniforge_base_url: default_miniforge_base(),
            overrides: default_overrides(),
        }
    }
}

fn default_python() -> String {
    "3.10".to_string()
}

fn default_miniforge_base() -> String {
    "https://github.com/conda-forge/miniforge/releases/latest/download".to_string()
}

/// Target-specific package pins from `[[environment.overrides]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentOverride {
    /// Target pattern: `*`, `macos-*`, `*-arm64` or `macos-arm64`.
    pub target: String,
    /// Extra conda specs installed alongside Python (e.g. `libblas=*=*accelerate`).
    #[serde(default)]
    pub conda: Vec<String>,
    /// pip requirements replacing base requirements of the same name.
    #[serde(default)]
    pub pip: Vec<String>,
    #[serde(default, rename = "extra-index-url")]
    pub extra_index_url: Option<String>,
}

impl EnvironmentOverride {
    pub fn applies_to(&self, target: &BuildTarget) -> bool {
        target.matches(&self.target)
    }
}

const TORCH_PACKAGES: [&str; 3] = ["torch", "torchvision", "torchaudio"];

fn default_overrides() -> Vec<EnvironmentOverride> {
    let torch = || TORCH_PACKAGES.iter().map(|p| p.to_string()).collect();
    let cuda_index = "https://download.pytorch.org/whl/cu121".to_string();
    vec![
        // Apple Silicon: Accelerate BLAS, stock wheels ship the MPS backend.
        EnvironmentOverride {
            target: "macos-arm64".to_string(),
            conda: vec!["libblas=*=*accelerate".to_string()],
            pip: torch(),
            extra_index_url: None,
        },
        EnvironmentOverride {
            target: "linux-x86_64".to_string(),
            conda: vec!["libblas=*=*openblas".to_string()],
            pip: torch(),
            extra_index_url: Some(cuda_index.clone()),
        },
        EnvironmentOverride {
            target: "windows-x86_64".to_string(),
            conda: vec!["libblas=*=*openblas".to_string()],
            pip: torch(),
            extra_index_url: Some(cuda_index),
        },
    ]
}

/// Launcher defaults from `[launcher]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    8188
}

/// CI platform settings from `[github]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// `owner/name`; falls back to `GITHUB_REPOSITORY`, then the `origin` remote.
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default = "default_workflow")]
    pub workflow: String,
    #[serde(default = "default_api_url", rename = "api-url")]
    pub api_url: String,
    #[serde(default = "default_poll_interval", rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout", rename = "timeout-secs")]
    pub timeout_secs: u64,
    /// Targets whose archives must all be present before a release is published.
    #[serde(default = "default_release_targets", rename = "release-targets")]
    pub release_targets: Vec<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repository: None,
            workflow: default_workflow(),
            api_url: default_api_url(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            release_targets: default_release_targets(),
        }
    }
}

fn default_workflow() -> String {
    "build.yml".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_timeout() -> u64 {
    2 * 60 * 60
}

fn default_release_targets() -> Vec<String> {
    ["macos-arm64", "macos-x86_64", "linux-x86_64", "windows-x86_64"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl PackConfig {
    /// Load `comfyport.toml` from `project_dir`, or return defaults if the file doesn't exist.
    pub fn load(project_dir: &Path) -> miette::Result<Self> {
        let path = Self::path_in(project_dir);
        if !path.is_file() {
            tracing::debug!("No {} in {}, using defaults", crate::CONFIG_FILE, project_dir.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(PortableError::Io)?;
        Self::parse_toml(&content).map_err(|e| {
            PortableError::ConfigInvalid {
                message: format!("{}: {e}", path.display()),
            }
            .into()
        })
    }

    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Path of the configuration file for a project directory.
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(crate::CONFIG_FILE)
    }

    pub fn version_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.package.version_file)
    }

    pub fn manifest_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.package.manifest)
    }

    pub fn requirements_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.package.requirements)
    }

    pub fn output_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.package.output_dir)
    }
}
