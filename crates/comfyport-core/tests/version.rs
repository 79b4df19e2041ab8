use comfyport_core::version::{read_version, PackageVersion};
use comfyport_util::errors::PortableError;

fn write_version(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("version.txt");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn valid_versions_are_returned_unchanged() {
    for v in ["0.0.0", "1.2.3", "10.20.30", "01.002.3"] {
        let (_dir, path) = write_version(&format!("{v}\n"));
        let version = read_version(&path).unwrap();
        assert_eq!(version.to_string(), v);
    }
}

#[test]
fn surrounding_whitespace_is_trimmed() {
    let (_dir, path) = write_version("  2.4.1 \r\n");
    assert_eq!(read_version(&path).unwrap().as_str(), "2.4.1");
}

#[test]
fn invalid_content_is_config_invalid() {
    for bad in ["", "1.2", "1.2.3.4", "v1.2.3", "1.2.3-beta", "1..3", "a.b.c", "1.2.3 4", "-1.2.3"] {
        let (_dir, path) = write_version(bad);
        let err = read_version(&path).unwrap_err();
        assert!(
            matches!(err, PortableError::ConfigInvalid { .. }),
            "'{bad}' gave {err:?}"
        );
    }
}

#[test]
fn missing_file_is_config_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_version(&dir.path().join("version.txt")).unwrap_err();
    assert!(matches!(err, PortableError::ConfigMissing { .. }));
}

#[test]
fn tag_prefixes_v() {
    let v: PackageVersion = "1.12.0".parse().unwrap();
    assert_eq!(v.tag(), "v1.12.0");
}

#[test]
fn oversized_components_are_kept_verbatim() {
    let (_dir, path) = write_version("1.2.99999999999999999999\n");
    let version = read_version(&path).unwrap();
    assert_eq!(version.as_str(), "1.2.99999999999999999999");
    assert_eq!(version.tag(), "v1.2.99999999999999999999");
}
