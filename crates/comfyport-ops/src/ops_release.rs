//! Operation: publish every platform archive as assets of release `v<version>`.

use std::path::{Path, PathBuf};

use comfyport_core::target::BuildTarget;
use comfyport_core::version::PackageVersion;
use comfyport_util::errors::PortableError;
use comfyport_util::progress::{status, status_info};

use crate::github::GitHubClient;
use crate::ops_archive::archive_file_name;

/// Outcome of a publish.
#[derive(Debug)]
pub struct ReleaseReport {
    pub tag: String,
    pub url: String,
    pub created: bool,
    pub uploaded: Vec<String>,
    pub replaced: Vec<String>,
}

/// Locate the archive of every expected target under `dist_dir`, each
/// followed by its `.sha256` sidecar when present.
///
/// Archives may sit directly in `dist_dir` or one level down (one directory
/// per downloaded CI artifact). Fails listing every missing archive if any
/// is absent, so a partial set never reaches the release.
pub fn collect_release_assets(
    dist_dir: &Path,
    archive_prefix: &str,
    version: &PackageVersion,
    targets: &[BuildTarget],
) -> miette::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for target in targets {
        let name = archive_file_name(archive_prefix, target, version);
        match find_file(dist_dir, &name) {
            Some(path) => {
                let sidecar = PathBuf::from(format!("{}.sha256", path.display()));
                found.push(path);
                if sidecar.is_file() {
                    found.push(sidecar);
                }
            }
            None => missing.push(name),
        }
    }

    if !missing.is_empty() {
        return Err(PortableError::ConfigMissing {
            what: format!(
                "release archives in {}: {}",
                dist_dir.display(),
                missing.join(", ")
            ),
        }
        .into());
    }
    Ok(found)
}

fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path().join(name))
        .find(|p| p.is_file())
}

/// Create or reuse release `version.tag()` and upload `assets`, replacing
/// assets of the same name.
pub async fn publish_release(
    client: &GitHubClient,
    version: &PackageVersion,
    assets: &[PathBuf],
) -> miette::Result<ReleaseReport> {
    let tag = version.tag();

    let (release, created) = match client.release_by_tag(&tag).await? {
        Some(release) => {
            status_info("Release", &format!("{tag} exists, updating assets"));
            (release, false)
        }
        None => {
            let release = client.create_release(&tag).await?;
            status("Created", &format!("release {tag}"));
            (release, true)
        }
    };

    let mut report = ReleaseReport {
        tag: tag.clone(),
        url: release.html_url.clone(),
        created,
        uploaded: Vec::new(),
        replaced: Vec::new(),
    };

    for path in assets {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Some(existing) = release.assets.iter().find(|a| a.name == name) {
            client.delete_asset(existing.id).await?;
            report.replaced.push(name.clone());
        }

        let sp = comfyport_util::progress::spinner(&format!("Uploading {name}..."));
        let result = client.upload_asset(&release, path).await;
        sp.finish_and_clear();
        result?;

        status("Uploaded", &name);
        report.uploaded.push(name);
    }

    Ok(report)
}

/// Parse the `[github].release-targets` list.
pub fn parse_targets(targets: &[String]) -> miette::Result<Vec<BuildTarget>> {
    targets
        .iter()
        .map(|t| t.parse::<BuildTarget>().map_err(miette::Report::from))
        .collect()
}
