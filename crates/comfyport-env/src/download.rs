//! Miniforge installer download from the conda-forge GitHub releases.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use comfyport_core::target::{Arch, BuildTarget, Os};
use comfyport_util::errors::PortableError;

/// File name of the Miniforge installer for a target.
pub fn installer_file_name(target: &BuildTarget) -> Result<&'static str, PortableError> {
    match (target.os, target.arch) {
        (Os::MacOs, Arch::X86_64) => Ok("Miniforge3-MacOSX-x86_64.sh"),
        (Os::MacOs, Arch::Arm64) => Ok("Miniforge3-MacOSX-arm64.sh"),
        (Os::Linux, Arch::X86_64) => Ok("Miniforge3-Linux-x86_64.sh"),
        (Os::Linux, Arch::Arm64) => Ok("Miniforge3-Linux-aarch64.sh"),
        (Os::Windows, Arch::X86_64) => Ok("Miniforge3-Windows-x86_64.exe"),
        (Os::Windows, Arch::Arm64) => Err(PortableError::UnsupportedTarget {
            target: target.to_string(),
        }),
    }
}

/// Build the download URL for the Miniforge installer of a target.
pub fn installer_url(target: &BuildTarget, base_url: &str) -> Result<String, PortableError> {
    Ok(format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        installer_file_name(target)?
    ))
}

/// Download a file from `url` to `dest`, showing a progress bar.
/// Returns the path written. A partially written file is removed on failure.
pub async fn download_file(url: &str, dest: &Path) -> miette::Result<PathBuf> {
    tracing::info!("Downloading {}", url);

    let result = stream_to_file(url, dest).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(dest).await {
            tracing::debug!("No partial download to remove at {}: {e}", dest.display());
        }
    }
    result?;
    Ok(dest.to_path_buf())
}

async fn stream_to_file(url: &str, dest: &Path) -> Result<(), PortableError> {
    let resp = reqwest::Client::builder()
        .user_agent("comfyport")
        .build()
        .map_err(|e| PortableError::Network {
            message: format!("Failed to build HTTP client: {e}"),
        })?
        .get(url)
        .send()
        .await
        .map_err(|e| PortableError::Network {
            message: format!("Failed to download {url}: {e}"),
        })?;

    if !resp.status().is_success() {
        return Err(PortableError::Network {
            message: format!("HTTP {} for {url}", resp.status()),
        });
    }

    let pb = resp
        .content_length()
        .filter(|len| *len > 0)
        .map(comfyport_util::progress::bytes_bar);

    let mut out = tokio::fs::File::create(dest).await?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| PortableError::Network {
            message: format!("Read error while downloading {url}: {e}"),
        })?;
        out.write_all(&chunk).await?;
        if let Some(ref pb) = pb {
            pb.inc(chunk.len() as u64);
        }
    }
    out.flush().await?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    Ok(())
}
