use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn comfyport_cmd() -> Command {
    Command::cargo_bin("comfyport").unwrap()
}

#[test]
fn test_help_lists_build_flags() {
    comfyport_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--local"))
        .stdout(predicate::str::contains("--ci"))
        .stdout(predicate::str::contains("--push"))
        .stdout(predicate::str::contains("--trigger-workflow"))
        .stdout(predicate::str::contains("--publish-release"));
}

#[test]
fn test_local_and_ci_conflict() {
    comfyport_cmd()
        .args(["--local", "--ci"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_unknown_target_rejected() {
    comfyport_cmd()
        .args(["--ci", "--target", "amiga-m68k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("amiga-m68k"));
}

#[test]
fn test_missing_project_fails() {
    let tmp = TempDir::new().unwrap();

    comfyport_cmd()
        .current_dir(tmp.path())
        .args(["--ci"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing configuration"));
}

#[test]
fn test_invalid_version_fails_without_output() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("version.txt"), "one.two\n").unwrap();
    fs::write(tmp.path().join("repos.json"), "[]").unwrap();

    comfyport_cmd()
        .current_dir(tmp.path())
        .args(["--ci", "--target", "linux-x86_64"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));

    assert!(!tmp.path().join("dist").exists());
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn git_repo(root: &Path, name: &str, file: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), "# stub\n").unwrap();
    git(&dir, &["init", "--quiet"]);
    git(&dir, &["add", "."]);
    git(&dir, &["commit", "--quiet", "-m", "init"]);
    dir
}

#[cfg(unix)]
#[test]
fn test_ci_build_prints_archive_path() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let repos = tmp.path().join("repos");
    let app = git_repo(&repos, "ComfyUI", "main.py");
    let plugin = git_repo(&repos, "plugin", "__init__.py");

    let project = tmp.path().join("project");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("version.txt"), "0.9.1\n").unwrap();
    fs::write(project.join("requirements.txt"), "aiohttp\n").unwrap();
    fs::write(
        project.join("repos.json"),
        format!("[{{\"url\": {:?}}}]", plugin.to_string_lossy()),
    )
    .unwrap();
    fs::write(
        project.join("comfyport.toml"),
        format!("[application]\nrepository = {:?}\n", app.to_string_lossy()),
    )
    .unwrap();

    let installer = tmp.path().join("Miniforge3-test.sh");
    fs::write(
        &installer,
        "#!/bin/bash\nmkdir -p \"$3/bin\"\n\
         printf '#!/bin/bash\\nexit 0\\n' > \"$3/bin/conda\"\n\
         printf '#!/bin/bash\\nexit 0\\n' > \"$3/bin/python\"\n\
         chmod +x \"$3/bin/conda\" \"$3/bin/python\"\n",
    )
    .unwrap();
    fs::set_permissions(&installer, fs::Permissions::from_mode(0o755)).unwrap();

    comfyport_cmd()
        .args(["--ci", "--target", "linux-x86_64", "--project-dir"])
        .arg(&project)
        .arg("--installer")
        .arg(&installer)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "anymatix-portable-comfyui-linux-x86_64-v0.9.1.zip",
        ));

    assert!(project
        .join("dist/anymatix/ComfyUI/custom_nodes/plugin/__init__.py")
        .is_file());
    assert!(project.join("dist/anymatix/anymatix_comfyui_linux").is_file());
}
