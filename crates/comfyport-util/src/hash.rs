use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Compute the SHA-256 hash of a file, returning a lowercase hex string.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write a `sha256sum`-compatible sidecar (`<file>.sha256`) next to `path`.
///
/// Returns the digest that was written.
pub fn write_sha256_sidecar(path: &Path) -> std::io::Result<String> {
    let digest = sha256_file(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut sidecar = path.as_os_str().to_os_string();
    sidecar.push(".sha256");
    std::fs::write(&sidecar, format!("{digest}  {name}\n"))?;
    Ok(digest)
}
