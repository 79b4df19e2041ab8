//! Operation: write the platform launcher into the staging root.
//!
//! Launchers are embedded templates with `{{variable}}` placeholders:
//! `port` (default port), `app_dir` (application clone) and `python`
//! (interpreter path relative to the package root).

use std::collections::BTreeMap;
use std::path::PathBuf;

use comfyport_core::layout::{interpreter_rel_path, StagingLayout};
use comfyport_core::target::{BuildTarget, Os};
use comfyport_util::errors::PortableError;

const MACOS_TEMPLATE: &str = include_str!("../templates/launcher_macos.sh");
const LINUX_TEMPLATE: &str = include_str!("../templates/launcher_linux.sh");
const WINDOWS_TEMPLATE: &str = include_str!("../templates/launcher_windows.bat");

/// Render the launcher script for `target`.
pub fn render_launcher(target: &BuildTarget, app_dir_name: &str, default_port: u16) -> String {
    let mut vars = BTreeMap::new();
    vars.insert("port", default_port.to_string());
    vars.insert("app_dir", app_dir_name.to_string());
    vars.insert("python", interpreter_rel_path(target).to_string());

    match target.os {
        Os::MacOs => interpolate(MACOS_TEMPLATE, &vars),
        Os::Linux => interpolate(LINUX_TEMPLATE, &vars),
        // cmd.exe mis-parses labels and `if` blocks in LF-only files.
        Os::Windows => interpolate(WINDOWS_TEMPLATE, &vars)
            .lines()
            .map(|l| format!("{l}\r\n"))
            .collect(),
    }
}

/// Write the launcher for `target` into the staging root and make it executable.
pub fn write_launcher(
    layout: &StagingLayout,
    target: &BuildTarget,
    default_port: u16,
) -> miette::Result<PathBuf> {
    let path = layout.launcher_path(target);
    let script = render_launcher(target, layout.app_dir_name(), default_port);
    std::fs::write(&path, script).map_err(PortableError::Io)?;

    if !target.is_windows() {
        comfyport_util::fs::set_executable(&path).map_err(PortableError::Io)?;
    }

    tracing::info!("Wrote launcher {}", path.display());
    Ok(path)
}

/// Replace every `{{key}}` placeholder in `input` with its value.
fn interpolate(input: &str, vars: &BTreeMap<&str, String>) -> String {
    let mut result = input.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{key}}}}}");
        result = result.replace(&placeholder, value);
    }
    result
}
