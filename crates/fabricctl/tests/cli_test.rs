//! Integration tests for the `fabricctl` CLI binary.
//!
//! Argument parsing, help, completions, and error handling run without a
//! controller; the end-to-end cases point the binary at a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ISSU: &str = "/appcenter/cisco/ndfc/api/v1/imagemanagement/rest/packagemgnt/issu";
const STAGE: &str =
    "/appcenter/cisco/ndfc/api/v1/imagemanagement/rest/stagingmanagement/stage-image";

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fabricctl` binary with env isolation.
///
/// Clears all `FABRICCTL_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn fabricctl_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fabricctl");
    cmd.env("HOME", "/tmp/fabricctl-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fabricctl-cli-test-nonexistent")
        .env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("FABRICCTL_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn issu(field: &str, status: &str) -> Value {
    let mut switch = json!({ "serialNumber": "SN1", "ipAddress": "10.0.0.1", "deviceName": "leaf1" });
    switch[field] = json!(status);
    json!({ "lastOperDataObject": [switch] })
}

async fn controller_with_status(body: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ISSU))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fabricctl_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    fabricctl_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("image")
            .and(predicate::str::contains("maintenance-mode"))
            .and(predicate::str::contains("--check-mode")),
    );
}

#[test]
fn test_version_flag() {
    fabricctl_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fabricctl"));
}

#[test]
fn test_image_subcommands_exist() {
    fabricctl_cmd()
        .args(["image", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("stage")
                .and(predicate::str::contains("validate"))
                .and(predicate::str::contains("upgrade"))
                .and(predicate::str::contains("status")),
        );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    fabricctl_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    fabricctl_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_stage_requires_serials() {
    let output = fabricctl_cmd().args(["image", "stage"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_stage_no_controller() {
    fabricctl_cmd()
        .args(["image", "stage", "SN1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No controller configured"));
}

#[test]
fn test_unknown_profile() {
    fabricctl_cmd()
        .args(["--profile", "lab", "image", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile 'lab' not found"));
}

#[test]
fn test_invalid_output_format() {
    let output = fabricctl_cmd()
        .args(["--output", "invalid", "image", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_maintenance_mode_requires_fabric() {
    fabricctl_cmd()
        .args(["maintenance-mode", "set", "--mode", "maintenance", "SN1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--fabric"));
}

#[test]
fn test_upgrade_without_tty_needs_yes() {
    fabricctl_cmd()
        .args([
            "--controller",
            "http://127.0.0.1:9",
            "image",
            "upgrade",
            "--policy",
            "NR3F",
            "SN1",
        ])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));
}

#[test]
fn test_boolean_check_interval_is_rejected() {
    fabricctl_cmd()
        .env("FABRICCTL_DEFAULTS__CHECK_INTERVAL", "true")
        .args(["--controller", "http://127.0.0.1:9", "image", "status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("check_interval"));
}

#[test]
fn test_unreachable_controller() {
    fabricctl_cmd()
        .args(["--controller", "http://127.0.0.1:9", "image", "status"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not reach the controller"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    fabricctl_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_config_path() {
    fabricctl_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Against a controller ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_image_status_json() {
    let server = controller_with_status(issu("imageStaged", "Success")).await;

    let output = fabricctl_cmd()
        .args(["--controller", &server.uri(), "-o", "json-compact", "image", "status"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["switches"][0]["serial_number"], json!("SN1"));
    assert_eq!(body["switches"][0]["image_staged"], json!("Success"));
    assert_eq!(body["ledger"]["changed"], json!(false));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_mode_stage_sends_no_mutation() {
    let server = controller_with_status(issu("imageStaged", "None")).await;

    let output = fabricctl_cmd()
        .args([
            "--controller",
            &server.uri(),
            "--check-mode",
            "--check-interval",
            "0",
            "-o",
            "json-compact",
            "image",
            "stage",
            "SN1",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["changed"], json!(true));
    assert_eq!(report["metadata"][0]["check_mode"], json!(true));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_stage_prints_ledger_and_exits_10() {
    let server = controller_with_status(issu("imageStaged", "None")).await;
    Mock::given(method("POST"))
        .and(path(STAGE))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    fabricctl_cmd()
        .args([
            "--controller",
            &server.uri(),
            "--check-interval",
            "0",
            "image",
            "stage",
            "SN1",
        ])
        .assert()
        .code(10)
        .stderr(
            predicate::str::contains("image_stage")
                .and(predicate::str::contains("failed: true"))
                .and(predicate::str::contains("Internal Server Error")),
        );
}
