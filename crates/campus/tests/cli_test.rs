//! Integration tests for the `campus` CLI binary.
//!
//! Argument parsing, completions and local-only commands run without any
//! server. Incident commands run against a wiremock API.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `campus` binary with env isolation.
///
/// Clears all `CAMPUS_*` env vars and points config and data directories
/// at `home` so tests never touch the user's real files.
fn campus_cmd_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("campus");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("CAMPUS_PROFILE")
        .env_remove("CAMPUS_API_URL")
        .env_remove("CAMPUS_WS_URL")
        .env_remove("CAMPUS_EMAIL")
        .env_remove("CAMPUS_OUTPUT")
        .env_remove("CAMPUS_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn campus_cmd() -> assert_cmd::Command {
    campus_cmd_in(Path::new("/tmp/campus-cli-test-nonexistent"))
}

/// Command with connection flags for a mock API.
fn campus_against(server: &MockServer, home: &Path) -> assert_cmd::Command {
    let mut cmd = campus_cmd_in(home);
    cmd.args([
        "--api-url",
        &format!("{}/dev", server.uri()),
        "--ws-url",
        "ws://127.0.0.1:9/dev",
        "--email",
        "ana@uni.edu",
    ]);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn history_file(home: &Path) -> std::path::PathBuf {
    home.join("data").join("campus-notify").join("state.json")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = campus_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    campus_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("watch")
            .and(predicate::str::contains("incidents"))
            .and(predicate::str::contains("history"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    campus_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("campus"));
}

#[test]
fn test_invalid_subcommand() {
    campus_cmd()
        .arg("nonexistent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_invalid_output_format() {
    campus_cmd()
        .args(["--output", "xml", "history", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_incidents_help_lists_actions() {
    campus_cmd().args(["incidents", "--help"]).assert().success().stdout(
        predicate::str::contains("list")
            .and(predicate::str::contains("create"))
            .and(predicate::str::contains("assign"))
            .and(predicate::str::contains("complete")),
    );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    campus_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    campus_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("campus"));
}

#[test]
fn test_completions_fish() {
    campus_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_incidents_without_config_is_usage_error() {
    let output = campus_cmd().args(["incidents", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("--api-url") || text.contains("config init"),
        "Expected a configuration hint:\n{text}"
    );
}

#[test]
fn test_unknown_profile_is_usage_error() {
    let output = campus_cmd()
        .args(["--profile", "night-shift", "incidents", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("night-shift"));
}

#[test]
fn test_config_show_without_file() {
    campus_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile"));
}

#[test]
fn test_config_use_missing_profile_fails() {
    let home = tempfile::tempdir().unwrap();
    campus_cmd_in(home.path())
        .args(["config", "use", "day-shift"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("day-shift"));
}

#[test]
fn test_config_file_profile_is_used() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("config").join("campus-notify");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        r#"
default_profile = "ops"

[profiles.ops]
api_url = "https://api.example.edu/dev"
ws_url = "wss://ws.example.edu/dev"
email = "ops@uni.edu"
"#,
    )
    .unwrap();

    campus_cmd_in(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ops *"));
}

// ── History ─────────────────────────────────────────────────────────

#[test]
fn test_history_list_empty() {
    let home = tempfile::tempdir().unwrap();
    campus_cmd_in(home.path())
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No notifications yet."));
}

#[test]
fn test_history_list_reads_saved_entries() {
    let home = tempfile::tempdir().unwrap();
    let file = history_file(home.path());
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(
        &file,
        json!({
            "notifications": [
                {
                    "incidente_id": "42",
                    "titulo": "Leak",
                    "old_estado": "pendiente",
                    "new_estado": "asignado",
                    "timestamp": "2024-11-16T10:15:00"
                }
            ]
        })
        .to_string(),
    )
    .unwrap();

    campus_cmd_in(home.path())
        .args(["--output", "plain", "history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn test_history_clear_requires_yes_when_not_interactive() {
    let home = tempfile::tempdir().unwrap();
    campus_cmd_in(home.path())
        .args(["history", "clear"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));
}

#[test]
fn test_history_clear_with_yes() {
    let home = tempfile::tempdir().unwrap();
    campus_cmd_in(home.path())
        .args(["--yes", "history", "clear"])
        .assert()
        .success();
    let text = std::fs::read_to_string(history_file(home.path())).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["notifications"], json!([]));
}

// ── Incidents against a mock API ────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_incidents_list_plain_prints_active_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/incidentes"))
        .and(header("x-user-email", "ana@uni.edu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "1", "titulo": "Old", "estado": "pendiente",
              "Fecha_creacion": "2024-11-01T08:00:00" },
            { "id": "2", "titulo": "New", "estado": "asignado",
              "Fecha_creacion": "2024-11-02T08:00:00" },
            { "id": "3", "titulo": "Done", "estado": "resuelto",
              "Fecha_creacion": "2024-11-03T08:00:00" }
        ])))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = campus_against(&server, home.path())
        .args(["--output", "plain", "incidents", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "2\n1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_incidents_list_forbidden_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/incidentes"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "not allowed" })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let output = campus_against(&server, home.path())
        .args(["incidents", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
}
