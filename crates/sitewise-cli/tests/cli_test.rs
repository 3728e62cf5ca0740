//! Integration tests for the `sitewise` binary
//!
//! Each test runs against its own temporary store with a cleared environment.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn sitewise(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sitewise"))
        .env_clear()
        .arg("--store-root")
        .arg(store)
        .arg("--config")
        .arg(store.join("config.toml"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_empty_project_list_as_json() {
    let store = TempDir::new().unwrap();

    let output = sitewise(store.path(), &["--json", "projects", "list"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let parsed = stdout_json(&output);
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["data"], serde_json::json!([]));
}

#[test]
fn test_config_reports_cli_override_source() {
    let store = TempDir::new().unwrap();

    let output = sitewise(store.path(), &["--json", "config"]);
    assert!(output.status.success());

    let parsed = stdout_json(&output);
    let rows = parsed["data"].as_array().unwrap();
    let store_root = rows.iter().find(|r| r["key"] == "store_root").unwrap();
    assert_eq!(store_root["source"], "Cli");

    let terrain = rows.iter().find(|r| r["key"] == "terrain_function").unwrap();
    assert_eq!(terrain["source"], "Default");
}

#[test]
fn test_missing_project_fails_with_guidance() {
    let store = TempDir::new().unwrap();

    let output = sitewise(store.path(), &["projects", "show", "west-texas-wind-farm"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("west-texas-wind-farm"));
    assert!(stderr.contains("To fix this"));
}

#[test]
fn test_ask_lists_projects_without_capabilities() {
    let store = TempDir::new().unwrap();

    let output = sitewise(store.path(), &["--json", "ask", "list my renewable projects"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let parsed = stdout_json(&output);
    assert_eq!(parsed["data"]["success"], true);
}

#[test]
fn test_doctor_flags_missing_required_capability() {
    let store = TempDir::new().unwrap();

    let output = sitewise(store.path(), &["--json", "doctor"]);
    assert!(output.status.success());

    let parsed = stdout_json(&output);
    let checks = parsed["data"]["checks"].as_array().unwrap();
    let terrain = checks.iter().find(|c| c["name"] == "Capability terrain").unwrap();
    assert_eq!(terrain["status"], "fail");
    assert_eq!(terrain["hint"], "Set SITEWISE_TERRAIN_FUNCTION");

    let store_check = checks.iter().find(|c| c["name"] == "Store").unwrap();
    assert_eq!(store_check["status"], "pass");
}

#[test]
fn test_delete_without_yes_needs_confirmation() {
    let store = TempDir::new().unwrap();
    let export = store.path().join("abilene.json");
    std::fs::write(
        &export,
        serde_json::json!({
            "version": "1.0",
            "exported_at": "2024-05-01T12:00:00Z",
            "project": {
                "project_id": "p-1",
                "project_name": "abilene-wind-farm",
                "created_at": "2024-05-01T12:00:00Z",
                "updated_at": "2024-05-01T12:00:00Z",
                "coordinates": {"latitude": 32.4487, "longitude": -99.7331}
            }
        })
        .to_string(),
    )
    .unwrap();

    let output = sitewise(store.path(), &["projects", "import", export.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = sitewise(store.path(), &["projects", "delete", "abilene-wind-farm"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--yes"));

    let output = sitewise(store.path(), &["projects", "delete", "abilene-wind-farm", "--yes"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = sitewise(store.path(), &["--json", "projects", "list"]);
    assert_eq!(stdout_json(&output)["data"], serde_json::json!([]));
}
