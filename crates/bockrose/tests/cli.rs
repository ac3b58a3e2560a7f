//! End-to-end tests for the bockrose binary.

use std::error::Error;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn project(yaml: &str) -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let file = dir.path().join("bockrose.yaml");
    std::fs::write(&file, yaml)?;
    Ok((dir, file))
}

fn bockrose(file: &PathBuf) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("bockrose")?;
    cmd.arg("-f").arg(file).env_remove("BOCKROSE_PROJECT_NAME");
    Ok(cmd)
}

#[test]
fn up_prints_prefixed_logs_and_exits_zero() -> Result<(), Box<dyn Error>> {
    let (_dir, file) = project(
        r#"
name: demo
services:
  web:
    command: ["sh", "-c", "echo hello"]
"#,
    )?;

    bockrose(&file)?
        .args(["up", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo-web-1 | hello"))
        .stdout(predicate::str::contains("demo-web-1 exited with code 0"));
    Ok(())
}

#[test]
fn up_returns_exit_code_from_selected_service() -> Result<(), Box<dyn Error>> {
    let (_dir, file) = project(
        r#"
name: demo
services:
  tests:
    command: ["sh", "-c", "exit 3"]
  server:
    command: ["sleep", "30"]
"#,
    )?;

    bockrose(&file)?
        .args(["up", "--no-color", "--exit-code-from", "tests"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Aborting on container exit..."))
        .stdout(predicate::str::contains("demo-tests-1 exited with code 3"));
    Ok(())
}

#[test]
fn up_without_prefix() -> Result<(), Box<dyn Error>> {
    let (_dir, file) = project(
        r#"
name: demo
services:
  web:
    command: ["sh", "-c", "echo bare"]
"#,
    )?;

    bockrose(&file)?
        .args(["up", "--no-color", "--no-log-prefix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bare\n"))
        .stdout(predicate::str::contains("| bare").not());
    Ok(())
}

#[test]
fn up_rejects_unknown_exit_code_service() -> Result<(), Box<dyn Error>> {
    let (_dir, file) = project(
        r#"
services:
  web:
    command: ["true"]
"#,
    )?;

    bockrose(&file)?
        .args(["up", "--exit-code-from", "db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such service: db"));
    Ok(())
}

#[test]
fn config_prints_resolved_project() -> Result<(), Box<dyn Error>> {
    let (_dir, file) = project(
        r#"
name: demo
services:
  web:
    command: ["true"]
    restart: on-failure:2
"#,
    )?;

    bockrose(&file)?
        .args(["config", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"restart\": \"on-failure:2\""))
        .stdout(predicate::str::contains("\"name\": \"demo\""));
    Ok(())
}

#[test]
fn config_quiet_reports_invalid_file() -> Result<(), Box<dyn Error>> {
    let (_dir, file) = project(
        r#"
services:
  web:
    command: []
"#,
    )?;

    bockrose(&file)?
        .args(["config", "-q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty command"));
    Ok(())
}
