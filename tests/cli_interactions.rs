//! CLI options interaction tests
//!
//! These tests validate that CLI options parse, conflict and report
//! errors correctly without needing a live feed.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Helper function to create a test command isolated from the caller's environment
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("slt").unwrap();
    cmd.current_dir(dir.path());
    for var in [
        "BASE_URL",
        "SYMBOL",
        "NUM_CONNECTIONS",
        "COLLECT_TIME",
        "RETRY_LIMIT",
        "RETRY_DELAY",
        "BACKOFF",
        "DEADLINE_MODE",
        "EQUAL_VAR",
        "LOG_LEVEL",
        "ENABLE_COLOR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_every_option() {
    let dir = TempDir::new().unwrap();
    let assert = create_test_cmd(&dir).arg("--help").assert().success();

    let mut stdout = predicate::str::contains("--base-url").boxed();
    for flag in [
        "--symbol",
        "--connections",
        "--collect-time",
        "--retry-limit",
        "--retry-delay",
        "--exponential-backoff",
        "--global-deadline",
        "--welch",
        "--log-level",
        "--no-color",
        "--json",
        "--export-ledger",
        "--env-help",
    ] {
        stdout = stdout.and(predicate::str::contains(flag)).boxed();
    }
    assert.stdout(stdout);
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_env_help_lists_variables() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--env-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Supported Environment Variables"))
        .stdout(predicate::str::contains("NUM_CONNECTIONS"))
        .stdout(predicate::str::contains("DEADLINE_MODE"))
        .stdout(predicate::str::contains("Configuration Priority"));
}

#[test]
fn test_color_flags_conflict() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--color", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--color and --no-color"));
}

#[test]
fn test_unparseable_values_are_usage_errors() {
    let dir = TempDir::new().unwrap();
    for args in [
        vec!["-n", "many"],
        vec!["-t", "0"],
        vec!["--retry-delay", "+3"],
        vec!["--log-level", "loud"],
        vec!["--unknown-flag"],
    ] {
        create_test_cmd(&dir).args(&args).assert().code(2);
    }
}

#[test]
fn test_env_file_values_are_validated() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "NUM_CONNECTIONS=0\n").unwrap();

    create_test_cmd(&dir)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Connection count must be greater than 0"));
}

#[test]
fn test_cli_overrides_env_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "BASE_URL=wss://feed.example.com/ws/\n").unwrap();

    // The CLI's invalid scheme wins over the valid .env value
    create_test_cmd(&dir)
        .args(["--no-color", "--base-url", "https://feed.example.com/ws/"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ws:// or wss://"));
}

#[test]
fn test_malformed_env_variable_is_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .env("BACKOFF", "linear")
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("BACKOFF"));
}
