use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn gridsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gridsync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("GRIDSYNC_LOG_LEVEL");
    cmd
}

fn stdout_json(home: &Path, args: &[&str]) -> Value {
    let output = gridsync_cmd(home).args(args).output().expect("run gridsync");
    assert!(output.status.success(), "gridsync {args:?} failed");
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn add_config(home: &Path, api_key: &str) {
    gridsync_cmd(home)
        .args(["config", "add", "Main", "--api-key", api_key, "--view-id", "view-1"])
        .assert()
        .success()
        .stdout(contains("✓ Added configuration 'main'"));
}

#[test]
fn config_list_masks_the_api_key() {
    let home = TempDir::new().expect("home");
    add_config(home.path(), "abcdefghijklmnop");

    gridsync_cmd(home.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(contains("main"))
        .stdout(contains("abcd…mnop"))
        .stdout(contains("abcdefghijklmnop").not());

    let configs = stdout_json(home.path(), &["config", "list", "--json"]);
    let configs = configs.as_array().expect("array");
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0]["is_active"], Value::Bool(true));
    assert_eq!(configs[0]["api_key"], Value::from("abcd…mnop"));
}

#[test]
fn duplicate_config_name_is_rejected() {
    let home = TempDir::new().expect("home");
    add_config(home.path(), "abcdefghijklmnop");

    gridsync_cmd(home.path())
        .args(["config", "add", "Main", "--api-key", "k", "--view-id", "v"])
        .assert()
        .failure()
        .stderr(contains("already exists"));
}

#[test]
fn project_without_configuration_is_saved_without_push() {
    let home = TempDir::new().expect("home");

    gridsync_cmd(home.path())
        .args([
            "project", "create", "Site", "--source", "en", "--target", "fr", "--target", "de",
            "--content", "article:1",
        ])
        .assert()
        .success()
        .stdout(contains("✓ Created project 'site'"))
        .stdout(contains("no grid configuration"));

    let project = stdout_json(home.path(), &["project", "show", "site", "--json"]);
    let subprojects = project["subprojects"].as_array().expect("subprojects");
    assert_eq!(subprojects.len(), 2);
    assert_eq!(subprojects[0]["target_language"], Value::from("fr"));
    assert!(project.get("last_sync").is_none());
}

#[test]
fn sync_without_configuration_reports_structured_error() {
    let home = TempDir::new().expect("home");
    gridsync_cmd(home.path())
        .args([
            "project", "create", "Site", "--source", "en", "--target", "fr", "--content",
            "article:1",
        ])
        .assert()
        .success();

    gridsync_cmd(home.path())
        .args(["sync", "site"])
        .assert()
        .failure()
        .stderr(contains("no active grid configuration"))
        .stderr(contains("\"error\": \"configuration\""));
}

#[test]
fn failed_initial_push_leaves_no_project_behind() {
    let home = TempDir::new().expect("home");
    add_config(home.path(), "");

    gridsync_cmd(home.path())
        .args([
            "project", "create", "Site", "--source", "en", "--target", "fr", "--content",
            "article:1",
        ])
        .assert()
        .failure()
        .stderr(contains("failed to create project 'Site'"))
        .stderr(contains("\"error\": \"configuration\""));

    let projects = stdout_json(home.path(), &["project", "list", "--json"]);
    assert_eq!(projects, Value::Array(vec![]));
}

#[test]
fn diff_of_project_without_content() {
    let home = TempDir::new().expect("home");
    gridsync_cmd(home.path())
        .args(["project", "create", "Empty", "--source", "en", "--target", "fr"])
        .assert()
        .success()
        .stdout(contains("no content selected"));

    gridsync_cmd(home.path())
        .args(["diff", "empty"])
        .assert()
        .success()
        .stdout(contains("'empty' has no selected content."));
}

#[test]
fn unknown_project_fails() {
    let home = TempDir::new().expect("home");
    gridsync_cmd(home.path())
        .args(["project", "show", "ghost"])
        .assert()
        .failure()
        .stderr(contains("project 'ghost' not found"));
}

#[test]
fn invalid_log_level_is_rejected() {
    let home = TempDir::new().expect("home");
    gridsync_cmd(home.path())
        .env("GRIDSYNC_LOG_LEVEL", "verbose")
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(contains("invalid log level 'verbose'"));
}

#[test]
fn malformed_content_reference_is_a_usage_error() {
    let home = TempDir::new().expect("home");
    gridsync_cmd(home.path())
        .args(["project", "create", "Site", "--source", "en", "--content", "article"])
        .assert()
        .failure()
        .stderr(contains("expected <type>:<id>"));
}

#[test]
fn project_ids_cannot_escape_the_registry() {
    let home = TempDir::new().expect("home");
    let outside = home.path().join(".gridsync").join("outside.yaml");
    std::fs::create_dir_all(outside.parent().expect("parent")).expect("mkdir");
    std::fs::write(&outside, "keep: me\n").expect("write");

    gridsync_cmd(home.path())
        .args(["project", "delete", "../outside"])
        .assert()
        .failure()
        .stderr(contains("invalid id '../outside'"));
    assert!(outside.exists());
}
