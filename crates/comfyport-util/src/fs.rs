use std::path::{Path, PathBuf};

/// Walk up from `start` looking for any of `filenames`.
/// Returns the path to the first directory containing one, or `None`.
pub fn find_ancestor_with(start: &Path, filenames: &[&str]) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if filenames.iter().any(|f| current.join(f).is_file()) {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Remove `path` (file or directory tree) and recreate it as an empty directory.
pub fn reset_dir(path: &Path) -> std::io::Result<()> {
    remove_path(path)?;
    std::fs::create_dir_all(path)
}

/// Remove a file or directory tree. Missing paths are not an error.
pub fn remove_path(path: &Path) -> std::io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Mark a file as executable (`0o755`). No-op on non-Unix platforms.
pub fn set_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Human-readable byte count (`1.5 GB`).
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
