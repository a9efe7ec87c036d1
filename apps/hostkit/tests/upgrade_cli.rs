//! End-to-end runs of the binary against a fake host root.
//!
//! Only paths that never reach apt or the network are exercised here:
//! status, reset, check on an unsupported host, continue without progress,
//! reboot-required and done.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use predicates::prelude::*;

mod common;

use common::TestHost;

#[test]
fn test_status_not_started() {
    let host = TestHost::debian("11", "bullseye");
    host.hostkit()
        .args(["upgrade", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Version:       11"))
        .stdout(predicate::str::contains("State:         not started"))
        .stdout(predicate::str::contains("Final release: 13"));
}

#[test]
fn test_status_after_reset_on_final_host() {
    let host = TestHost::debian("13", "trixie").with_marker("13");
    host.hostkit().args(["upgrade", "--reset"]).assert().success();
    host.hostkit()
        .args(["upgrade", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("State:         not started"))
        .stdout(predicate::str::contains("Next:          nothing, host is on the final release"));
}

#[test]
fn test_status_with_marker() {
    let host = TestHost::debian("11", "bullseye").with_marker("12");
    host.hostkit()
        .args(["upgrade", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("phase to 12 complete"));
    assert_eq!(host.marker().as_deref(), Some("12"));
}

#[test]
fn test_status_json() {
    let host = TestHost::debian("12", "bookworm");
    let output = host
        .hostkit()
        .args(["--json-mode", "upgrade", "--status"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["host"]["version"], "12");
    assert_eq!(value["state"]["state"], "not_started");
    assert_eq!(value["final_version"], "13");
    assert!(value["persisted"].is_null());
}

#[test]
fn test_status_survives_corrupt_state() {
    let host = TestHost::debian("11", "bullseye").with_marker("12\n13");
    host.hostkit()
        .args(["upgrade", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Problem:"));
}

#[test]
fn test_reset_removes_marker() {
    let host = TestHost::debian("12", "bookworm").with_marker("12");
    host.hostkit()
        .args(["upgrade", "--reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upgrade state cleared"));
    assert!(!host.state_file.exists());

    host.hostkit()
        .args(["upgrade", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("State:         not started"));

    host.hostkit()
        .args(["upgrade", "--reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to reset"));
}

#[test]
fn test_unsupported_version_fails_without_state() {
    let host = TestHost::debian("10", "buster");
    host.hostkit()
        .args(["upgrade", "--check"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unsupported OS version: 10"));

    host.hostkit()
        .args(["upgrade", "-y"])
        .assert()
        .failure()
        .code(1);
    assert!(!host.state_file.exists());
}

#[test]
fn test_continue_requires_progress() {
    let host = TestHost::debian("11", "bullseye");
    host.hostkit()
        .args(["upgrade", "--continue", "-y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to continue"));
    assert!(!host.state_file.exists());
}

#[test]
fn test_completed_phase_needs_reboot() {
    let host = TestHost::debian("11", "bullseye").with_marker("12");
    host.hostkit()
        .args(["upgrade", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already completed"));
    assert_eq!(host.marker().as_deref(), Some("12"));
}

#[test]
fn test_final_release_clears_marker() {
    let host = TestHost::debian("13", "trixie").with_marker("13");
    host.hostkit()
        .args(["upgrade", "--continue", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded upgrade state cleared"));
    assert!(!host.state_file.exists());
}

#[test]
fn test_inconsistent_marker_is_state_error() {
    let host = TestHost::debian("11", "bullseye").with_marker("13");
    host.hostkit()
        .args(["upgrade", "-y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hostkit upgrade --reset"));
    assert_eq!(host.marker().as_deref(), Some("13"));
}

#[test]
fn test_unknown_config_key_exits_nonzero() {
    let host = TestHost::debian("11", "bullseye");
    std::fs::write(&host.config, "[upgrade]\nbogus = 1\n").unwrap();
    host.hostkit()
        .args(["upgrade", "--status"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_client_config_requires_install() {
    let host = TestHost::debian("12", "bookworm");
    host.hostkit()
        .args(["client-config", "snell", "--server", "203.0.113.4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("snell is not installed"));
    assert!(host.os_release.exists());
}
