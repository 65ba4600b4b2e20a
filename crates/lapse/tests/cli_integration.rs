//! CLI integration tests for the lapse command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Config files are discovered and validated
//! - The demo and soak commands run end to end

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the lapse binary, isolated from any user config.
fn lapse(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lapse").unwrap();
    cmd.current_dir(dir)
        .env_remove("LAPSE_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env("HOME", dir);
    cmd
}

fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("custom.toml");
    fs::write(&path, contents).unwrap();
    path
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    lapse(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("session store"))
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("soak"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    lapse(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lapse"));
}

#[test]
fn test_demo_help() {
    let dir = TempDir::new().unwrap();
    lapse(dir.path())
        .args(["demo", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--duration-secs"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    lapse(dir.path()).arg("frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    lapse(dir.path())
        .args(["--config", "does-not-exist.toml", "demo", "--duration-secs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "[session]\nscan_period_secs = 0\n");
    lapse(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["demo", "--duration-secs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session.scan_period_secs"));
}

#[test]
fn test_project_config_discovered() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("lapse.toml"),
        "[session]\nscan_period_secs = 0\n",
    )
    .unwrap();

    // The broken project-local file is picked up without --config.
    lapse(dir.path())
        .args(["demo", "--duration-secs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session.scan_period_secs"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_demo_session_survives_short_run() {
    let dir = TempDir::new().unwrap();
    lapse(dir.path())
        .args(["--json", "demo", "--duration-secs", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("longhoang.de"))
        .stdout(predicate::str::contains("\"survived\": true"));
}

#[test]
fn test_demo_session_expires() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "[session]\nstaleness_threshold_secs = 1\nscan_period_secs = 1\n",
    );
    lapse(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["--json", "demo", "--duration-secs", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"survived\": false"))
        .stdout(predicate::str::contains("\"evicted_total\": 1"));
}

#[test]
fn test_demo_text_output() {
    let dir = TempDir::new().unwrap();
    lapse(dir.path())
        .args(["demo", "--duration-secs", "0", "--website", "example.org"])
        .assert()
        .success()
        .stdout(predicate::str::contains("example.org"))
        .stdout(predicate::str::contains("still live"));
}

#[test]
fn test_soak_is_consistent() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "[session]\nstaleness_threshold_secs = 0\nscan_period_secs = 1\nreap_mode = \"single-pass\"\n",
    );
    lapse(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["--json", "soak", "--workers", "4", "--duration-secs", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"consistent\": true"));
}
