//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

const DB_ENV: &[&str] = &[
    "MONGO_URL",
    "DB_HOST",
    "DB_PORT",
    "DB_USER",
    "DB_PASS",
    "DB_ENABLED",
    "DB_PROBE_TIMEOUT_MS",
    "LIBRARIAN_BIND",
    "LIBRARIAN_DRAIN_TIMEOUT_SECS",
];

/// `librarian` with a clean database environment and no `.env` in reach.
fn librarian(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("librarian").unwrap();
    cmd.current_dir(dir.path());
    for var in DB_ENV {
        cmd.env_remove(var);
    }
    cmd
}

// === Help ===

#[test]
fn test_serve_help_lists_database_settings() {
    let dir = tempfile::tempdir().unwrap();
    librarian(&dir)
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MONGO_URL"))
        .stdout(predicate::str::contains("DB_PROBE_TIMEOUT_MS"));
}

#[test]
fn test_serve_help_hides_password_value() {
    let dir = tempfile::tempdir().unwrap();
    librarian(&dir)
        .env("DB_PASS", "hunter2")
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}

// === Schema ===

#[test]
fn test_schema_prints_sdl() {
    let dir = tempfile::tempdir().unwrap();
    librarian(&dir)
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("type Query"))
        .stdout(predicate::str::contains("createAuthor"));
}

#[test]
fn test_schema_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.graphql");

    librarian(&dir)
        .arg("schema")
        .arg("--output")
        .arg(&path)
        .assert()
        .success();

    let sdl = std::fs::read_to_string(&path).unwrap();
    assert!(sdl.contains("type Mutation"));
}

// === Completions ===

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    librarian(&dir)
        .arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("librarian"));
}

// === Serve startup failures ===

#[test]
fn test_serve_rejects_invalid_port() {
    let dir = tempfile::tempdir().unwrap();
    librarian(&dir)
        .args(["serve", "--bind", "127.0.0.1:0", "--db-port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid database port"));
}

#[test]
fn test_serve_fails_when_database_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    librarian(&dir)
        .args([
            "serve",
            "--bind",
            "127.0.0.1:0",
            "--db-host",
            "127.0.0.1",
            "--db-port",
            "1",
            "--probe-timeout-ms",
            "300",
        ])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Startup failed"));
}
