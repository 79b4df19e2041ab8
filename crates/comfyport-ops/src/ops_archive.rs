//! Operation: package the staging directory as a versioned zip archive.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use comfyport_core::target::BuildTarget;
use comfyport_core::version::PackageVersion;
use comfyport_util::errors::PortableError;

/// Files at or above this size get zip64 headers.
const LARGE_FILE_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Result of a successful archive step.
#[derive(Debug)]
pub struct ArchiveResult {
    pub path: PathBuf,
    pub sha256: String,
    pub entries: usize,
    pub size: u64,
}

/// `{prefix}-{platform}-{architecture}-v{version}.zip`
pub fn archive_file_name(prefix: &str, target: &BuildTarget, version: &PackageVersion) -> String {
    format!(
        "{prefix}-{}-{}-v{version}.zip",
        target.platform(),
        target.architecture()
    )
}

/// Zip `staging_root` into `dest` and write the `.sha256` sidecar.
///
/// Every entry is stored under `<root-name>/`, so extraction yields exactly
/// one top-level directory. Symlinks are stored as links, not followed.
/// On failure the partial archive is removed.
pub fn create_archive(staging_root: &Path, dest: &Path) -> miette::Result<ArchiveResult> {
    if !staging_root.is_dir() {
        return Err(PortableError::ConfigMissing {
            what: format!("staging directory {}", staging_root.display()),
        }
        .into());
    }
    let root_name = staging_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| PortableError::ConfigInvalid {
            message: format!("staging directory {} has no name", staging_root.display()),
        })?;

    if let Some(parent) = dest.parent() {
        comfyport_util::fs::ensure_dir(parent).map_err(PortableError::Io)?;
    }

    let sp = comfyport_util::progress::spinner(&format!("Compressing {root_name}..."));
    let result = write_zip(staging_root, &root_name, dest);
    sp.finish_and_clear();

    let entries = match result {
        Ok(n) => n,
        Err(e) => {
            if let Err(rm) = comfyport_util::fs::remove_path(dest) {
                tracing::warn!("Failed to remove partial archive {}: {rm}", dest.display());
            }
            return Err(e.into());
        }
    };

    let sha256 = comfyport_util::hash::write_sha256_sidecar(dest).map_err(PortableError::Io)?;
    let size = fs::metadata(dest).map_err(PortableError::Io)?.len();

    Ok(ArchiveResult {
        path: dest.to_path_buf(),
        sha256,
        entries,
        size,
    })
}

fn write_zip(staging_root: &Path, root_name: &str, dest: &Path) -> Result<usize, PortableError> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let base = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    for entry in WalkDir::new(staging_root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(staging_root)
            .map_err(std::io::Error::other)?;
        let name = entry_name(root_name, rel);
        let meta = entry.metadata().map_err(std::io::Error::from)?;
        let options = base.unix_permissions(unix_mode(&meta));

        if entry.path_is_symlink() {
            let target = fs::read_link(entry.path())?;
            zip.add_symlink(name, target.to_string_lossy(), options)
                .map_err(zip_error)?;
        } else if meta.is_dir() {
            zip.add_directory(name, options).map_err(zip_error)?;
        } else {
            zip.start_file(name, options.large_file(meta.len() >= LARGE_FILE_THRESHOLD))
                .map_err(zip_error)?;
            let mut src = File::open(entry.path())?;
            std::io::copy(&mut src, &mut zip)?;
        }
        entries += 1;
    }

    let mut out = zip.finish().map_err(zip_error)?;
    out.flush()?;
    Ok(entries)
}

/// Archive path of a staged file: `<root>/<a>/<b>` with forward slashes.
fn entry_name(root_name: &str, rel: &Path) -> String {
    std::iter::once(root_name.to_string())
        .chain(rel.components().map(|c| c.as_os_str().to_string_lossy().to_string()))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn unix_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn unix_mode(meta: &fs::Metadata) -> u32 {
    if meta.is_dir() {
        0o755
    } else {
        0o644
    }
}

fn zip_error(e: ZipError) -> PortableError {
    match e {
        ZipError::Io(io) => PortableError::Io(io),
        other => PortableError::Io(std::io::Error::other(other)),
    }
}
