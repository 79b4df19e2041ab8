//! Operation: build the portable package (environment, clones, launcher, archive).
//!
//! Every input (version, manifest, requirements, configuration) is read and
//! validated before the staging directory is touched. The steps then run in
//! order and the first failure aborts the rest.

use std::path::{Path, PathBuf};
use std::time::Instant;

use comfyport_core::config::PackConfig;
use comfyport_core::layout::StagingLayout;
use comfyport_core::manifest::PluginManifest;
use comfyport_core::requirements::RequirementSet;
use comfyport_core::target::BuildTarget;
use comfyport_core::version::{read_version, PackageVersion};
use comfyport_env::install;
use comfyport_env::plan::EnvironmentPlan;
use comfyport_util::errors::PortableError;
use comfyport_util::progress::{status, status_info, status_warn};

use crate::ops_archive::{self, ArchiveResult};
use crate::ops_fetch::{self, FetchReport};
use crate::ops_launcher;

/// Interactive developer build or unattended CI build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    #[default]
    Local,
    Ci,
}

/// Options for a build invocation.
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub mode: BuildMode,
    /// Build target; the host when absent.
    pub target: Option<BuildTarget>,
    /// Already downloaded Miniforge installer to use instead of downloading one.
    pub installer: Option<PathBuf>,
    pub verbose: bool,
}

/// Validated inputs of one build.
#[derive(Debug)]
pub struct BuildInputs {
    pub config: PackConfig,
    pub version: PackageVersion,
    pub manifest: PluginManifest,
    pub plan: EnvironmentPlan,
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildResult {
    pub version: PackageVersion,
    pub target: BuildTarget,
    pub staging_root: PathBuf,
    pub launcher: PathBuf,
    pub archive: ArchiveResult,
    pub fetch: FetchReport,
}

/// Read and validate everything the build needs.
pub fn load_inputs(project_dir: &Path, target: BuildTarget) -> miette::Result<BuildInputs> {
    let config = PackConfig::load(project_dir)?;
    let version = read_version(&config.version_path(project_dir))?;
    let manifest = PluginManifest::from_path(&config.manifest_path(project_dir))?;
    let requirements = RequirementSet::from_path(&config.requirements_path(project_dir))?;
    let plan = EnvironmentPlan::resolve(target, &config.environment, requirements)?;
    // Fail on targets without an installer before any download or clone.
    comfyport_env::download::installer_file_name(&target)?;

    Ok(BuildInputs {
        config,
        version,
        manifest,
        plan,
    })
}

/// Run the full build pipeline.
pub fn build(project_dir: &Path, opts: &BuildOptions) -> miette::Result<BuildResult> {
    let start = Instant::now();

    let target = match opts.target {
        Some(t) => t,
        None => BuildTarget::host()?,
    };
    let inputs = load_inputs(project_dir, target)?;
    let BuildInputs {
        config,
        version,
        manifest,
        plan,
    } = inputs;

    status(
        "Packaging",
        &format!("{} v{version} ({target})", config.package.archive_prefix),
    );
    if opts.verbose {
        status_info("Python", &plan.python);
        for spec in &plan.conda_specs {
            status_info("Conda", spec);
        }
        status_info(
            "Pip",
            &format!("{} requirement(s)", plan.requirements.requirements.len()),
        );
        status_info("Plugins", &format!("{}", manifest.len()));
    }

    let layout = StagingLayout::for_project(&config, project_dir);
    prepare_staging(layout.root(), opts.mode)?;

    // 1. Portable interpreter
    let prefix = layout.python_dir();
    match opts.installer {
        Some(ref installer) => install::install_from_installer(&plan, installer, &prefix)?,
        None => {
            let rt = tokio::runtime::Runtime::new().map_err(PortableError::Io)?;
            rt.block_on(install::build_environment(
                &plan,
                &prefix,
                &config.environment.miniforge_base_url,
            ))?;
        }
    }

    // 2. Application and plugins
    let fetch = ops_fetch::fetch(&layout, &config.application, &manifest, &config.fetch)?;

    // 3. Launcher
    let launcher = ops_launcher::write_launcher(&layout, &target, config.launcher.port)?;
    status("Generated", &format!("launcher {}", launcher.display()));

    // 4. Archive
    let archive_name = ops_archive::archive_file_name(&config.package.archive_prefix, &target, &version);
    let dest = config.output_dir(project_dir).join(archive_name);
    let archive = ops_archive::create_archive(layout.root(), &dest)?;

    status(
        "Finished",
        &format!(
            "{} ({}, {} entries) in {:.1}s",
            archive.path.display(),
            comfyport_util::fs::format_bytes(archive.size),
            archive.entries,
            start.elapsed().as_secs_f64()
        ),
    );
    if !fetch.skipped.is_empty() {
        let names: Vec<_> = fetch.skipped.iter().map(|s| s.name.as_str()).collect();
        status_warn("Skipped", &format!("plugins not included: {}", names.join(", ")));
    }

    Ok(BuildResult {
        version,
        target,
        staging_root: layout.root().to_path_buf(),
        launcher,
        archive,
        fetch,
    })
}

/// Empty the staging directory, asking first in an interactive local build.
fn prepare_staging(root: &Path, mode: BuildMode) -> miette::Result<()> {
    let occupied = root
        .read_dir()
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);

    if occupied {
        if mode == BuildMode::Local && atty::is(atty::Stream::Stdin) {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!(
                    "  Staging directory {} is not empty. Remove it and rebuild?",
                    root.display()
                ))
                .default(true)
                .interact()
                .map_err(|e| PortableError::Io(std::io::Error::other(e)))?;
            if !confirmed {
                return Err(PortableError::Io(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("staging directory {} kept; build cancelled", root.display()),
                ))
                .into());
            }
        }
        status_warn("Removing", &format!("previous staging {}", root.display()));
    }

    comfyport_util::fs::reset_dir(root).map_err(PortableError::Io)?;
    Ok(())
}
