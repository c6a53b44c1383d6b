use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("sayra")
        .env("SAYRA_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("sayra")
        .env("SAYRA_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("[session]"));
    assert!(contents.contains("endpoint ="));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "# existing config").unwrap();

    cargo_bin_cmd!("sayra")
        .env("SAYRA_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# existing config");
}

#[test]
fn test_config_show_applies_overrides() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[ui]\nlog_capacity = 10\n",
    )
    .unwrap();

    cargo_bin_cmd!("sayra")
        .env("SAYRA_HOME", dir.path())
        .env_remove("SAYRA_ENDPOINT")
        .args(["--endpoint", "http://10.0.0.5:8080", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("endpoint = \"http://10.0.0.5:8080\""))
        .stdout(predicate::str::contains("log_capacity = 10"));
}

#[test]
fn test_config_show_rejects_bad_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "[session\n").unwrap();

    cargo_bin_cmd!("sayra")
        .env("SAYRA_HOME", dir.path())
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}
