//! CLI integration tests
//!
//! These tests run the `migrator` binary against temporary workspaces with
//! auto-commit disabled, so no git repository is needed.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const RENAME_STEP: &str = r#"
migrator: RenameDependency
options:
  dependency-map:
    "commons-lang:commons-lang": "org.apache.commons:commons-lang3"
"#;

fn migrator() -> Command {
    let mut cmd = Command::cargo_bin("migrator").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("MIGRATOR_LOG_LEVEL");
    cmd
}

fn write_unit(root: &Path, name: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("build.gradle"),
        "dependencies {\n    implementation 'commons-lang:commons-lang:2.6'\n}\n",
    )
    .unwrap();
}

fn write_steps(root: &Path) -> std::path::PathBuf {
    let steps = root.join("steps");
    fs::create_dir_all(&steps).unwrap();
    fs::write(steps.join("010_rename.yml"), RENAME_STEP).unwrap();
    steps
}

#[test]
fn test_cli_help() {
    migrator()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("project"))
        .stdout(predicate::str::contains("projects"));
}

#[test]
fn test_migrate_single_project() {
    let workspace = TempDir::new().unwrap();
    let steps = TempDir::new().unwrap();
    write_unit(workspace.path(), "app_core");
    let steps = write_steps(steps.path());

    migrator()
        .args(["--no-auto-commit", "--quiet", "project"])
        .arg(workspace.path().join("app_core"))
        .arg(&steps)
        .assert()
        .success()
        .stdout(predicate::str::contains("Migration Summary Report:"))
        .stdout(predicate::str::contains(
            "Project 'app_core': 1 operations (1 successful, 0 skipped, 0 unknown, 0 warnings, 0 failed)",
        ));

    let build = fs::read_to_string(workspace.path().join("app_core/build.gradle")).unwrap();
    assert!(build.contains("'org.apache.commons:commons-lang3:2.6'"));
}

#[test]
fn test_migrate_workspace_writes_report() {
    let workspace = TempDir::new().unwrap();
    let steps = TempDir::new().unwrap();
    write_unit(workspace.path(), "app_core");
    write_unit(workspace.path(), "app_store");
    let steps = write_steps(steps.path());
    let report = steps.join("report.json");

    migrator()
        .args(["--no-auto-commit", "--quiet", "--report"])
        .arg(&report)
        .arg("projects")
        .arg(workspace.path())
        .arg(&steps)
        .assert()
        .success()
        .stdout(predicate::str::contains("Project 'app_store'"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    let projects = json["projects"].as_object().unwrap();
    assert_eq!(projects.keys().collect::<Vec<_>>(), vec!["app_core", "app_store"]);
    for project in projects.values() {
        assert_eq!(project["counts"]["success"], 1);
        assert_eq!(project["counts"]["failed"], 0);
        let operation = &project["operations"][0];
        assert_eq!(operation["kind"], "MODIFY");
        assert_eq!(operation["status"], "SUCCESS");
        assert!(operation["source"].as_str().unwrap().ends_with("build.gradle"));
    }
    assert_eq!(json["critical_errors"], serde_json::json!([]));
}

#[test]
fn test_failed_unit_is_reported_without_failing_the_run() {
    let workspace = TempDir::new().unwrap();
    let steps = TempDir::new().unwrap();
    let unit = workspace.path().join("app_docs");
    fs::create_dir_all(&unit).unwrap();
    let steps = write_steps(steps.path());
    let report = workspace.path().join("report.json");

    migrator()
        .args(["--no-auto-commit", "--quiet", "--report"])
        .arg(&report)
        .arg("project")
        .arg(&unit)
        .arg(&steps)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Project 'app_docs': 1 operations (0 successful, 0 skipped, 0 unknown, 0 warnings, 1 failed)",
        ))
        .stdout(predicate::str::contains("  Failed operations:"))
        .stdout(predicate::str::contains("step 010_rename.yml: no build script"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    let operation = &json["projects"]["app_docs"]["operations"][0];
    assert_eq!(operation["status"], "FAILED");
    assert_eq!(operation["target"], "010_rename.yml");
}

#[test]
fn test_invalid_log_level_is_rejected() {
    let workspace = TempDir::new().unwrap();
    let steps = TempDir::new().unwrap();
    write_unit(workspace.path(), "app_core");
    let steps = write_steps(steps.path());

    migrator()
        .args(["--no-auto-commit", "--log-level", "loud", "project"])
        .arg(workspace.path().join("app_core"))
        .arg(&steps)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'loud'"));

    migrator()
        .env("MIGRATOR_LOG_LEVEL", "loud")
        .args(["--no-auto-commit", "project"])
        .arg(workspace.path().join("app_core"))
        .arg(&steps)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid MIGRATOR_LOG_LEVEL 'loud'"));

    let build = fs::read_to_string(workspace.path().join("app_core/build.gradle")).unwrap();
    assert!(build.contains("'commons-lang:commons-lang:2.6'"));
}

#[test]
fn test_invalid_directory_fails() {
    let steps = TempDir::new().unwrap();
    let steps = write_steps(steps.path());

    migrator()
        .args(["--no-auto-commit", "project", "/definitely/not/here"])
        .arg(&steps)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn test_unknown_handler_fails() {
    let workspace = TempDir::new().unwrap();
    let steps = TempDir::new().unwrap();
    write_unit(workspace.path(), "app_core");
    fs::write(steps.path().join("010_bogus.yml"), "migrator: NoSuchHandler\n").unwrap();

    migrator()
        .args(["--no-auto-commit", "--quiet", "project"])
        .arg(workspace.path().join("app_core"))
        .arg(steps.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown migration handler 'NoSuchHandler'"));
}
