//! Environment installation: run the Miniforge installer in batch mode into
//! the package's `python/` prefix, then install Python, conda pins and pip
//! requirements into it.

use std::path::{Path, PathBuf};

use comfyport_core::target::BuildTarget;
use comfyport_util::errors::PortableError;
use comfyport_util::process::CommandBuilder;
use comfyport_util::progress;

use crate::download;
use crate::plan::EnvironmentPlan;

/// Path of the `conda` executable inside an installed prefix.
pub fn conda_exe(prefix: &Path, target: &BuildTarget) -> PathBuf {
    if target.is_windows() {
        prefix.join("Scripts").join("conda.exe")
    } else {
        prefix.join("bin").join("conda")
    }
}

/// Path of the Python interpreter inside an installed prefix.
pub fn python_exe(prefix: &Path, target: &BuildTarget) -> PathBuf {
    if target.is_windows() {
        prefix.join("python.exe")
    } else {
        prefix.join("bin").join("python")
    }
}

/// Download Miniforge for the plan's target and build the environment at `prefix`.
///
/// Any existing content at `prefix` is removed first. The installer is
/// downloaded into a temporary directory that is dropped afterwards.
pub async fn build_environment(
    plan: &EnvironmentPlan,
    prefix: &Path,
    miniforge_base_url: &str,
) -> miette::Result<()> {
    let tmp_dir = tempfile::tempdir().map_err(PortableError::Io)?;
    let url = download::installer_url(&plan.target, miniforge_base_url)?;
    let installer = tmp_dir
        .path()
        .join(download::installer_file_name(&plan.target)?);

    progress::status("Downloading", &url);
    download::download_file(&url, &installer).await?;

    install_from_installer(plan, &installer, prefix)
}

/// Run an already downloaded installer into `prefix` and install the planned packages.
pub fn install_from_installer(
    plan: &EnvironmentPlan,
    installer: &Path,
    prefix: &Path,
) -> miette::Result<()> {
    comfyport_util::fs::remove_path(prefix).map_err(PortableError::Io)?;
    if let Some(parent) = prefix.parent() {
        comfyport_util::fs::ensure_dir(parent).map_err(PortableError::Io)?;
    }

    let pb = progress::spinner("Installing Miniforge...");
    let result = run_installer(&plan.target, installer, prefix);
    pb.finish_and_clear();
    result?;
    progress::status("Installed", &format!("Miniforge into {}", prefix.display()));

    let conda = conda_exe(prefix, &plan.target);
    let pb = progress::spinner(&format!("Installing Python {}...", plan.python));
    let result = CommandBuilder::new(conda.to_string_lossy())
        .args(plan.conda_install_args())
        .env("CONDA_PKGS_DIRS", prefix.join("pkgs").to_string_lossy())
        .run();
    pb.finish_and_clear();
    result?;
    progress::status(
        "Installed",
        &format!("Python {} with {} conda pin(s)", plan.python, plan.conda_specs.len()),
    );

    install_requirements(plan, prefix)?;

    CommandBuilder::new(conda.to_string_lossy())
        .args(["clean", "--all", "--yes"])
        .run()?;

    Ok(())
}

/// Invoke the installer in batch mode so it never touches the user's shell
/// profile, registry or PATH.
fn run_installer(target: &BuildTarget, installer: &Path, prefix: &Path) -> Result<(), PortableError> {
    let cmd = if target.is_windows() {
        let absolute = std::path::absolute(prefix).map_err(PortableError::Io)?;
        CommandBuilder::new(installer.to_string_lossy()).args([
            "/S".to_string(),
            "/InstallationType=JustMe".to_string(),
            "/RegisterPython=0".to_string(),
            "/AddToPath=0".to_string(),
            // Must be last and unquoted.
            format!("/D={}", absolute.display()),
        ])
    } else {
        CommandBuilder::new("bash")
            .arg(installer.to_string_lossy())
            .args(["-b", "-p"])
            .arg(prefix.to_string_lossy())
    };
    cmd.run()?;
    Ok(())
}

fn install_requirements(plan: &EnvironmentPlan, prefix: &Path) -> miette::Result<()> {
    if plan.requirements.requirements.is_empty() {
        tracing::info!("No pip requirements to install");
        return Ok(());
    }

    let tmp = tempfile::tempdir().map_err(PortableError::Io)?;
    let req_file = tmp.path().join("requirements.txt");
    std::fs::write(&req_file, plan.requirements.render()).map_err(PortableError::Io)?;

    let python = python_exe(prefix, &plan.target);
    let pb = progress::spinner(&format!(
        "Installing {} pip requirement(s)...",
        plan.requirements.requirements.len()
    ));
    let result = CommandBuilder::new(python.to_string_lossy())
        .args(["-m", "pip", "install", "--no-cache-dir", "-r"])
        .arg(req_file.to_string_lossy())
        .env("PYTHONNOUSERSITE", "1")
        .env("PIP_DISABLE_PIP_VERSION_CHECK", "1")
        .run();
    pb.finish_and_clear();
    result?;

    progress::status(
        "Installed",
        &format!("{} pip requirement(s)", plan.requirements.requirements.len()),
    );
    Ok(())
}
