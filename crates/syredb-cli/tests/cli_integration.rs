//! Integration tests for syredb-cli
//!
//! These tests run the binary end-to-end against scenario files.
//! Tests run serially so log and color environment variables stay stable.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;

/// Get a Command for the syredb binary
fn syredb() -> Command {
    let mut cmd = Command::cargo_bin("syredb").unwrap();
    cmd.env_remove("SYREDB_LOG").env("NO_COLOR", "1");
    cmd
}

/// Path to a bundled demo scenario
fn demo(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "..", "..", "demos", name]
        .iter()
        .collect();
    path.to_string_lossy().into_owned()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
#[serial]
fn test_cli_help() {
    syredb()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("syredb"))
        .stdout(predicate::str::contains("boot"))
        .stdout(predicate::str::contains("scenario"));
}

#[test]
#[serial]
fn test_cli_version() {
    syredb()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("syredb"));
}

#[test]
#[serial]
fn test_boot_requires_scenario() {
    syredb().arg("boot").assert().failure();
}

// =============================================================================
// Scenario Command Tests
// =============================================================================

#[test]
#[serial]
fn test_scenario_template_is_valid_json() {
    let output = syredb().args(["scenario", "template"]).output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["saved_config"]["db_url"].is_string());
    assert!(value["accounts"].is_array());
}

#[test]
#[serial]
fn test_scenario_check_lists_replies() {
    syredb()
        .args(["scenario", "check", &demo("connection-refused.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid scenario"))
        .stdout(predicate::str::contains("connect_to_database"))
        .stdout(predicate::str::contains("err: connection refused"));
}

#[test]
#[serial]
fn test_scenario_check_json() {
    let output = syredb()
        .args(["--format", "json", "scenario", "check", &demo("fresh-install.json")])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0]["operation"], "get_config");
    assert_eq!(rows[0]["queued"], 1);
}

#[test]
#[serial]
fn test_scenario_check_rejects_bad_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    syredb()
        .args(["scenario", "check", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load scenario"));
}

// =============================================================================
// Boot Command Tests
// =============================================================================

#[test]
#[serial]
fn test_boot_fresh_install_shows_setup_form() {
    syredb()
        .args(["boot", "--no-input", "--scenario", &demo("fresh-install.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database configuration"));
}

#[test]
#[serial]
fn test_boot_connection_refused() {
    syredb()
        .args(["boot", "--no-input", "--scenario", &demo("connection-refused.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update your connection settings"))
        .stdout(predicate::str::contains("localhost:5432"))
        .stderr(predicate::str::contains("connection refused"));
}

#[test]
#[serial]
fn test_boot_remembered_session() {
    syredb()
        .args(["boot", "--scenario", &demo("remembered-session.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as owner@example.com (owner)"))
        .stdout(predicate::str::contains("Database: syredb"))
        .stdout(predicate::str::contains("User management: available"));
}

#[test]
#[serial]
fn test_boot_sign_out_returns_to_login() {
    syredb()
        .args([
            "boot",
            "--no-input",
            "--sign-out",
            "--scenario",
            &demo("remembered-session.json"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Log in"));
}

#[test]
#[serial]
fn test_boot_config_error_exits_non_zero() {
    syredb()
        .args(["boot", "--scenario", &demo("config-unreadable.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Could not load app config. permission denied",
        ));
}

#[test]
#[serial]
fn test_boot_json_prints_final_view() {
    let output = syredb()
        .args([
            "--format",
            "json",
            "boot",
            "--scenario",
            &demo("remembered-session.json"),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["view"], "ready");
    assert_eq!(view["user"]["email"], "owner@example.com");
    assert_eq!(view["database"], "syredb");
    assert_eq!(view["can_manage_users"], true);
}

#[test]
#[serial]
fn test_boot_json_never_leaks_password() {
    syredb()
        .args([
            "--format",
            "json",
            "boot",
            "--no-input",
            "--scenario",
            &demo("connection-refused.json"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"view\": \"connection_error\""))
        .stdout(predicate::str::contains("change-me").not());
}

#[test]
#[serial]
fn test_boot_quiet_prints_nothing_on_stdout() {
    syredb()
        .args([
            "boot",
            "--quiet",
            "--no-input",
            "--scenario",
            &demo("fresh-install.json"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
#[serial]
fn test_boot_missing_scenario_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");

    syredb()
        .args(["boot", "--scenario", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load scenario"));
}
