//! Operation: trigger a CI workflow, wait for its run, and fetch its artifacts.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use comfyport_util::errors::PortableError;
use comfyport_util::progress::{status, status_info, status_warn};

use crate::github::{GhRun, GitHubClient};

/// How long to wait and how often to look.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }
}

/// Result of a single poll.
#[derive(Debug)]
pub enum PollState<T> {
    /// Not there yet; the string is shown as progress.
    Pending(String),
    Done(T),
}

/// Call `check` until it reports [`PollState::Done`] or `policy.timeout` elapses.
///
/// `check` runs once immediately, then after every `policy.interval`. Errors
/// from `check` end the wait. Progress is printed on every pending poll.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, what: &str, mut check: F) -> miette::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = miette::Result<PollState<T>>>,
{
    let start = tokio::time::Instant::now();
    loop {
        let progress = match check().await? {
            PollState::Done(value) => return Ok(value),
            PollState::Pending(progress) => progress,
        };

        let elapsed = start.elapsed();
        status_info(
            "Waiting",
            &format!("{what}: {progress} ({}s elapsed)", elapsed.as_secs()),
        );
        if elapsed >= policy.timeout {
            return Err(PortableError::Timeout {
                message: format!(
                    "{what} still {progress} after {}s",
                    policy.timeout.as_secs()
                ),
            }
            .into());
        }
        tokio::time::sleep(policy.interval.min(policy.timeout - elapsed)).await;
    }
}

/// Dispatch `workflow` on `branch` and return the id of the run it created.
///
/// The new run is the first `workflow_dispatch` run on the branch with an id
/// above the newest one seen before the dispatch.
pub async fn trigger_workflow(
    client: &GitHubClient,
    workflow: &str,
    branch: &str,
) -> miette::Result<u64> {
    let previous = client
        .list_dispatch_runs(workflow, branch)
        .await?
        .iter()
        .map(|r| r.id)
        .max();

    client.dispatch_workflow(workflow, branch).await?;
    status("Triggered", &format!("{workflow} on {branch} ({})", client.repo()));

    let locate = PollPolicy::from_secs(2, 60);
    let run_id = poll_until(locate, "new workflow run", move || async move {
        let runs = client.list_dispatch_runs(workflow, branch).await?;
        Ok(match select_new_run(&runs, previous) {
            Some(id) => PollState::Done(id),
            None => PollState::Pending("not registered yet".to_string()),
        })
    })
    .await?;

    status_info("Run", &format!("{run_id}"));
    Ok(run_id)
}

/// Newest run with an id above `previous`.
pub fn select_new_run(runs: &[GhRun], previous: Option<u64>) -> Option<u64> {
    runs.iter()
        .map(|r| r.id)
        .filter(|id| previous.map_or(true, |p| *id > p))
        .max()
}

/// Poll `run_id` until it completes. A non-success conclusion is
/// [`PortableError::WorkflowFailed`].
pub async fn wait_for_run(
    client: &GitHubClient,
    run_id: u64,
    policy: PollPolicy,
) -> miette::Result<GhRun> {
    let run = poll_until(policy, &format!("run {run_id}"), move || async move {
        let run = client.get_run(run_id).await?;
        Ok(if run.status == "completed" {
            PollState::Done(run)
        } else {
            PollState::Pending(run.status)
        })
    })
    .await?;

    run_outcome(&run)?;
    status("Completed", &format!("run {run_id} {}", run.html_url));
    Ok(run)
}

/// Success only for a completed run concluded `success`.
pub fn run_outcome(run: &GhRun) -> Result<(), PortableError> {
    match run.conclusion.as_deref() {
        Some("success") if run.status == "completed" => Ok(()),
        conclusion => Err(PortableError::WorkflowFailed {
            run_id: run.id,
            conclusion: conclusion.unwrap_or(run.status.as_str()).to_string(),
        }),
    }
}

/// Download every artifact of `run_id` and unpack each into `out_dir/<name>/`.
pub async fn download_artifacts(
    client: &GitHubClient,
    run_id: u64,
    out_dir: &Path,
) -> miette::Result<Vec<PathBuf>> {
    let artifacts = client.list_artifacts(run_id).await?;
    if artifacts.is_empty() {
        status_warn("Warning", &format!("run {run_id} has no artifacts"));
        return Ok(Vec::new());
    }
    comfyport_util::fs::ensure_dir(out_dir).map_err(PortableError::Io)?;

    let tmp = tempfile::tempdir().map_err(PortableError::Io)?;
    let mut extracted = Vec::new();
    for artifact in &artifacts {
        if artifact.expired {
            status_warn("Expired", &artifact.name);
            continue;
        }
        status(
            "Downloading",
            &format!(
                "{} ({})",
                artifact.name,
                comfyport_util::fs::format_bytes(artifact.size_in_bytes)
            ),
        );
        let zip_path = tmp.path().join(format!("{}.zip", artifact.id));
        client
            .download(&artifact.archive_download_url, &zip_path)
            .await?;

        let dest = out_dir.join(&artifact.name);
        comfyport_util::fs::reset_dir(&dest).map_err(PortableError::Io)?;
        extract_zip(&zip_path, &dest)?;
        extracted.push(dest);
    }

    status("Downloaded", &format!("{} artifact(s) to {}", extracted.len(), out_dir.display()));
    Ok(extracted)
}

/// Unpack `zip_path` into `dest`, keeping unix modes. Entries escaping
/// `dest` are rejected.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> miette::Result<()> {
    let file = fs::File::open(zip_path).map_err(PortableError::Io)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| PortableError::ConfigInvalid {
        message: format!("{} is not a zip archive: {e}", zip_path.display()),
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| PortableError::ConfigInvalid {
            message: format!("Zip entry error in {}: {e}", zip_path.display()),
        })?;

        let rel = entry
            .enclosed_name()
            .ok_or_else(|| PortableError::ConfigInvalid {
                message: format!("Unsafe path '{}' in {}", entry.name(), zip_path.display()),
            })?;
        let out_path = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(PortableError::Io)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(PortableError::Io)?;
        }
        let mut out = fs::File::create(&out_path).map_err(PortableError::Io)?;
        std::io::copy(&mut entry, &mut out).map_err(PortableError::Io)?;
        drop(out);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o7777))
                    .map_err(PortableError::Io)?;
            }
        }
    }
    Ok(())
}
