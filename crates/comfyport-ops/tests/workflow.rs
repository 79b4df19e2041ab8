use std::cell::Cell;
use std::fs;
use std::io::Write;
use std::time::Duration;

use comfyport_ops::github::GhRun;
use comfyport_ops::ops_workflow::{
    extract_zip, poll_until, run_outcome, select_new_run, PollPolicy, PollState,
};
use comfyport_util::errors::PortableError;

fn fast_policy(timeout_ms: u64) -> PollPolicy {
    PollPolicy::new(Duration::from_millis(5), Duration::from_millis(timeout_ms))
}

fn run(json: &str) -> GhRun {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn poll_returns_once_done() {
    let calls = Cell::new(0);
    let value = poll_until(fast_policy(5_000), "run 1", || {
        calls.set(calls.get() + 1);
        let n = calls.get();
        async move {
            Ok(if n < 3 {
                PollState::Pending("in_progress".to_string())
            } else {
                PollState::Done(n * 10)
            })
        }
    })
    .await
    .unwrap();

    assert_eq!(value, 30);
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn poll_times_out() {
    let report = poll_until(fast_policy(30), "run 7", || async {
        Ok(PollState::<()>::Pending("queued".to_string()))
    })
    .await
    .unwrap_err();

    match report.downcast_ref::<PortableError>() {
        Some(PortableError::Timeout { message }) => assert!(message.contains("run 7"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn poll_check_errors_end_the_wait() {
    let calls = Cell::new(0);
    let report = poll_until(fast_policy(5_000), "run 9", || {
        calls.set(calls.get() + 1);
        async {
            Err::<PollState<()>, _>(miette::Report::from(PortableError::Network {
                message: "connection reset".to_string(),
            }))
        }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.get(), 1);
    assert!(report.to_string().contains("connection reset"));
}

#[test]
fn run_outcome_follows_conclusion() {
    assert!(run_outcome(&run(r#"{"id": 1, "status": "completed", "conclusion": "success"}"#)).is_ok());

    for (json, expected) in [
        (r#"{"id": 2, "status": "completed", "conclusion": "failure"}"#, "failure"),
        (r#"{"id": 3, "status": "completed", "conclusion": "cancelled"}"#, "cancelled"),
        (r#"{"id": 4, "status": "completed", "conclusion": null}"#, "completed"),
    ] {
        match run_outcome(&run(json)) {
            Err(PortableError::WorkflowFailed { conclusion, .. }) => assert_eq!(conclusion, expected),
            other => panic!("unexpected outcome for {json}: {other:?}"),
        }
    }
}

#[test]
fn new_run_is_newer_than_previous() {
    let runs: Vec<GhRun> = serde_json::from_str(
        r#"[
            {"id": 105, "status": "queued", "html_url": "https://github.com/o/r/actions/runs/105"},
            {"id": 101, "status": "completed", "conclusion": "success"}
        ]"#,
    )
    .unwrap();

    assert_eq!(select_new_run(&runs, Some(101)), Some(105));
    assert_eq!(select_new_run(&runs, Some(105)), None);
    assert_eq!(select_new_run(&runs, None), Some(105));
    assert_eq!(select_new_run(&[], None), None);
}

#[test]
fn artifact_zip_is_extracted_with_modes() {
    let tmp = tempfile::tempdir().unwrap();
    let zip_path = tmp.path().join("artifact.zip");
    {
        let mut zip = zip::ZipWriter::new(fs::File::create(&zip_path).unwrap());
        let opts = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        zip.add_directory("nested/", opts).unwrap();
        zip.start_file("nested/pkg.zip", opts).unwrap();
        zip.write_all(b"payload").unwrap();
        zip.finish().unwrap();
    }

    let dest = tmp.path().join("out");
    extract_zip(&zip_path, &dest).unwrap();
    assert_eq!(fs::read(dest.join("nested/pkg.zip")).unwrap(), b"payload");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(dest.join("nested/pkg.zip")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn escaping_entries_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let zip_path = tmp.path().join("evil.zip");
    {
        let mut zip = zip::ZipWriter::new(fs::File::create(&zip_path).unwrap());
        zip.start_file("../escape.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"nope").unwrap();
        zip.finish().unwrap();
    }

    let dest = tmp.path().join("out");
    assert!(extract_zip(&zip_path, &dest).is_err());
    assert!(!tmp.path().join("escape.txt").exists());
}

#[test]
fn non_zip_is_config_invalid() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.zip");
    fs::write(&path, "not a zip").unwrap();
    let report = extract_zip(&path, &tmp.path().join("out")).unwrap_err();
    assert!(matches!(
        report.downcast_ref::<PortableError>(),
        Some(PortableError::ConfigInvalid { .. })
    ));
}

#[test]
fn large_stored_entry_is_extracted_intact() {
    let tmp = tempfile::tempdir().unwrap();
    let payload: Vec<u8> = (0..8 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let zip_path = tmp.path().join("artifact.zip");
    {
        let mut zip = zip::ZipWriter::new(fs::File::create(&zip_path).unwrap());
        let opts = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        zip.start_file("anymatix-portable-comfyui-linux-x86_64-v1.0.0.zip", opts)
            .unwrap();
        for chunk in payload.chunks(64 * 1024) {
            zip.write_all(chunk).unwrap();
        }
        zip.finish().unwrap();
    }

    let dest = tmp.path().join("out");
    extract_zip(&zip_path, &dest).unwrap();

    let extracted = dest.join("anymatix-portable-comfyui-linux-x86_64-v1.0.0.zip");
    assert_eq!(fs::metadata(&extracted).unwrap().len(), payload.len() as u64);
    assert!(fs::read(&extracted).unwrap() == payload);
}
