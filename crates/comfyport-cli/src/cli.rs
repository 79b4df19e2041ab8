//! CLI argument definitions for comfyport.
//!
//! A single flag-driven command: build (locally or on CI), optionally push
//! and dispatch the CI workflow, or publish the archives of a finished CI
//! run as a release.

use std::path::PathBuf;

use clap::Parser;
use comfyport_core::target::BuildTarget;

#[derive(Parser, Debug)]
#[command(
    name = "comfyport",
    version,
    about = "Build portable ComfyUI packages",
    long_about = "comfyport assembles a self-contained ComfyUI distribution: a Miniforge \
                  Python environment, the ComfyUI sources with their custom nodes, and a \
                  launcher script, packed into one zip per platform."
)]
pub struct Cli {
    /// Build on this machine, asking before clearing an existing build (default)
    #[arg(long, conflicts_with = "ci")]
    pub local: bool,

    /// Build non-interactively, as on a CI runner
    #[arg(long)]
    pub ci: bool,

    /// Run `git push` after a successful build
    #[arg(long)]
    pub push: bool,

    /// Dispatch the CI build workflow on the current branch after the build
    #[arg(long)]
    pub trigger_workflow: bool,

    /// Target to build for, as <os>-<arch> (default: this machine)
    #[arg(long, value_name = "OS-ARCH")]
    pub target: Option<BuildTarget>,

    /// Use an already downloaded Miniforge installer
    #[arg(long, value_name = "PATH")]
    pub installer: Option<PathBuf>,

    /// Project root (default: nearest directory with comfyport.toml or version.txt)
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Publish the platform archives as release v<version> instead of building
    #[arg(
        long,
        conflicts_with_all = ["local", "ci", "push", "trigger_workflow", "target", "installer"]
    )]
    pub publish_release: bool,

    /// Directory holding the archives to publish (default: the output directory)
    #[arg(long, value_name = "DIR", requires = "publish_release")]
    pub dist: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
