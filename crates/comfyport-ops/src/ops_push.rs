//! Operation: push the project repository and query its current branch.

use std::path::Path;

use comfyport_util::errors::PortableError;
use comfyport_util::process::CommandBuilder;

/// `git push` in `project_dir`.
pub fn push(project_dir: &Path) -> miette::Result<()> {
    CommandBuilder::new("git")
        .arg("push")
        .cwd(project_dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .run()?;
    comfyport_util::progress::status("Pushed", &project_dir.display().to_string());
    Ok(())
}

/// Name of the checked-out branch. A detached HEAD is an error.
pub fn current_branch(project_dir: &Path) -> miette::Result<String> {
    let output = CommandBuilder::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .cwd(project_dir)
        .run()?;
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        return Err(PortableError::ConfigMissing {
            what: format!("checked-out branch in {} (HEAD is detached)", project_dir.display()),
        }
        .into());
    }
    Ok(branch)
}
