//! End-to-end checks of the `infra` and `cluster` binaries
//!
//! Only paths that need neither a terminal nor the external tools are
//! exercised here.

#![cfg(target_os = "linux")]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary with HOME and XDG_CONFIG_HOME pointing into `home`
fn bin(name: &str, home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(name).unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(home: &Path, body: &str) {
    let dir = home.join(".config").join("infra");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), body).unwrap();
}

#[test]
fn test_missing_config_points_at_config_subcommand() {
    let home = TempDir::new().unwrap();

    bin("infra", home.path())
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration not found"))
        .stderr(predicate::str::contains("infra config"));

    bin("cluster", home.path())
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cluster config"));
}

#[test]
fn test_corrupt_config() {
    let home = TempDir::new().unwrap();
    write_config(home.path(), "{ not json");

    bin("infra", home.path())
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("corrupted or invalid JSON"));
}

#[test]
fn test_infra_list_prints_numbered_names() {
    let home = TempDir::new().unwrap();
    let infra_dir = home.path().join("infras");
    for name in ["prod", "dev"] {
        fs::create_dir_all(infra_dir.join(name)).unwrap();
    }
    write_config(
        home.path(),
        &serde_json::json!({ "infra_dir": infra_dir }).to_string(),
    );

    bin("infra", home.path())
        .arg("list")
        .assert()
        .success()
        .stdout("1. dev\n2. prod\n");
}

#[test]
fn test_infra_list_empty() {
    let home = TempDir::new().unwrap();
    let infra_dir = home.path().join("infras");
    write_config(
        home.path(),
        &serde_json::json!({ "infra_dir": infra_dir }).to_string(),
    );

    bin("infra", home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No infrastructure found."));
    assert!(infra_dir.is_dir());
}

#[test]
fn test_legacy_directory_takes_precedence() {
    let home = TempDir::new().unwrap();
    let legacy = home.path().join(".infra");
    fs::create_dir_all(&legacy).unwrap();
    fs::write(legacy.join("config.json"), "not json").unwrap();

    bin("infra", home.path())
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(".infra/config.json"));
}

#[test]
fn test_menu_requires_terminal() {
    let home = TempDir::new().unwrap();

    bin("cluster", home.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not interactive"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();

    bin("cluster", home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("cluster "));
}
