use assert_cmd::Command;

/// Nothing listens on this port, so every request fails right away.
const UNREACHABLE_SERVICE: &str = "http://127.0.0.1:1";

/// Rejected while parsing arguments, before any request is made.
#[test]
fn unknown_status_is_rejected() {
    let mut cmd = Command::cargo_bin("assisted-test").unwrap();
    cmd.args(&[
        "--service-url",
        UNREACHABLE_SERVICE,
        "wait-hosts",
        "--cluster-id",
        "c1",
        "--status",
        "not-a-status",
        "--timeout",
        "1",
    ]);
    let assert = cmd.assert().failure().code(2);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("not-a-status"), "stderr: {}", stderr);
    assert!(!stderr.contains("Timed out"), "stderr: {}", stderr);
}

#[test]
fn unknown_cluster_status_is_rejected() {
    let mut cmd = Command::cargo_bin("assisted-test").unwrap();
    cmd.args(&[
        "--service-url",
        UNREACHABLE_SERVICE,
        "wait-cluster",
        "--cluster-id",
        "c1",
        "--status",
        "installed",
        "--break-on",
        "discovering",
        "--timeout",
        "1",
    ]);
    cmd.assert().failure().code(2);
}

#[test]
fn status_is_required() {
    let mut cmd = Command::cargo_bin("assisted-test").unwrap();
    cmd.args(&["wait-cluster", "--cluster-id", "c1"]);
    cmd.assert().failure();
}

/// Failed fetches are retried until the timeout, which is what gets reported.
#[test]
fn wait_times_out_when_the_service_is_unreachable() {
    let mut cmd = Command::cargo_bin("assisted-test").unwrap();
    cmd.env_remove("REMOTE_SERVICE_URL").args(&[
        "--service-url",
        UNREACHABLE_SERVICE,
        "wait-cluster",
        "--cluster-id",
        "c1",
        "--status",
        "installed",
        "--timeout",
        "2",
        "--interval",
        "1",
    ]);
    let assert = cmd.assert().failure().code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("Timed out"), "stderr: {}", stderr);
}
