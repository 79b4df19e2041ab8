use comfyport_util::fs::{
    ensure_dir, find_ancestor_with, format_bytes, remove_path, reset_dir,
};
use tempfile::TempDir;

#[test]
fn test_find_ancestor_with_direct() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("version.txt"), "1.0.0").unwrap();
    let result = find_ancestor_with(tmp.path(), &["comfyport.toml", "version.txt"]);
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_nested() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("comfyport.toml"), "").unwrap();
    let nested = tmp.path().join("a").join("b").join("c");
    std::fs::create_dir_all(&nested).unwrap();
    let result = find_ancestor_with(&nested, &["comfyport.toml"]);
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_not_found() {
    let tmp = TempDir::new().unwrap();
    let result = find_ancestor_with(tmp.path(), &["NonExistent.file"]);
    assert_eq!(result, None);
}

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    assert!(!deep.exists());
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_reset_dir_empties_existing_tree() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("anymatix");
    std::fs::create_dir_all(dir.join("python/bin")).unwrap();
    std::fs::write(dir.join("python/bin/python"), "old").unwrap();

    reset_dir(&dir).unwrap();

    assert!(dir.is_dir());
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
}

#[test]
fn test_remove_path_missing_is_ok() {
    let tmp = TempDir::new().unwrap();
    remove_path(&tmp.path().join("never-created")).unwrap();
}

#[test]
fn test_format_bytes() {
    assert_eq!(format_bytes(512), "512 B");
    assert_eq!(format_bytes(2048), "2.0 KB");
    assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
}

#[cfg(unix)]
#[test]
fn test_set_executable() {
    use std::os::unix::fs::PermissionsExt;
    let tmp = TempDir::new().unwrap();
    let script = tmp.path().join("run");
    std::fs::write(&script, "#!/bin/sh\n").unwrap();
    comfyport_util::fs::set_executable(&script).unwrap();
    let mode = std::fs::metadata(&script).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}
