//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::path::Path;
use std::process::Command;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use studyhub_core::{Database, TimerEngine};
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_studyhub"))
        .args(args)
        .env("STUDYHUB_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{args:?} printed non-JSON ({e}): {stdout}"))
}

/// Every JSON document printed by one command, in order.
fn run_json_stream(data_dir: &Path, args: &[&str]) -> Vec<Value> {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::Deserializer::from_str(&stdout)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .unwrap_or_else(|e| panic!("{args:?} printed non-JSON ({e}): {stdout}"))
}

/// Store `engine` where the CLI keeps its timer between invocations.
fn seed_engine(data_dir: &Path, engine: &TimerEngine) {
    let db = Database::open_at(&data_dir.join("studyhub.db")).unwrap();
    db.kv_set("timer_engine", &serde_json::to_string(engine).unwrap())
        .unwrap();
}

#[test]
fn fresh_timer_is_idle_work() {
    let dir = TempDir::new().unwrap();
    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["type"], "state_snapshot");
    assert_eq!(status["state"], "idle");
    assert_eq!(status["mode"], "work");
    assert_eq!(status["label"], "Work");
    assert_eq!(status["remaining_secs"], 1500);
    assert_eq!(status["clock"], "25:00");
}

#[test]
fn timer_state_survives_between_invocations() {
    let dir = TempDir::new().unwrap();

    let selected = run_json(dir.path(), &["timer", "mode", "long"]);
    assert_eq!(selected["type"], "mode_selected");
    assert_eq!(selected["remaining_secs"], 900);

    let started = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(started["type"], "timer_started");
    assert_eq!(started["mode"], "long");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["state"], "running");
    assert_eq!(status["mode"], "long");

    let paused = run_json(dir.path(), &["timer", "pause"]);
    assert_eq!(paused["type"], "timer_paused");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_ne!(status["state"], "running");

    let reset = run_json(dir.path(), &["timer", "reset"]);
    assert_eq!(reset["type"], "timer_reset");
    assert_eq!(reset["mode"], "long");
    assert_eq!(reset["remaining_secs"], 900);
}

#[test]
fn unknown_mode_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["timer", "mode", "nap"]);
    assert_ne!(code, 0);
}

#[test]
fn empty_history_shows_placeholder() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["history", "list"]);
    assert_eq!(code, 0, "{stderr}");
    assert_eq!(stdout, "Session history\nNo sessions logged yet.\n");

    let listed = run_json(dir.path(), &["history", "list", "--json"]);
    assert_eq!(listed, Value::Array(vec![]));
}

#[test]
fn history_clear_and_delete() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["history", "clear"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("All sessions cleared"));

    let (_, stderr, code) = run_cli(dir.path(), &["history", "delete", "missing-id"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "{stderr}");
}

#[test]
fn config_set_changes_timer_durations() {
    let dir = TempDir::new().unwrap();

    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "timer.work_minutes", "50"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "timer.work_minutes"]);
    assert_eq!(stdout.trim(), "50");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["remaining_secs"], 3000);
    assert_eq!(status["clock"], "50:00");
}

#[test]
fn config_rejects_bad_keys_and_values() {
    let dir = TempDir::new().unwrap();

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "timer.nope"]);
    assert_eq!(code, 1);

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "timer.nope", "1"]);
    assert_eq!(code, 1);

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "timer.short_minutes", "0"]);
    assert_eq!(code, 1);
}

#[test]
fn config_path_and_show() {
    let dir = TempDir::new().unwrap();

    let (stdout, _, code) = run_cli(dir.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));

    let (stdout, _, code) = run_cli(dir.path(), &["config", "show"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("[timer]"));
    assert!(stdout.contains("work_minutes = 25"));
}

#[test]
fn interval_finished_while_away_is_recorded_once() {
    let dir = TempDir::new().unwrap();
    let mut engine = TimerEngine::default();
    engine.start(Utc::now() - Duration::seconds(2000));
    seed_engine(dir.path(), &engine);

    let docs = run_json_stream(dir.path(), &["timer", "status"]);
    let types: Vec<&str> = docs.iter().map(|d| d["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["timer_completed", "session_recorded", "state_snapshot"]);
    assert_eq!(docs[0]["mode"], "work");
    assert_eq!(docs[0]["next_mode"], "short");
    assert_eq!(docs[1]["session"]["mode"], "work");
    assert_eq!(docs[2]["state"], "idle");
    assert_eq!(docs[2]["mode"], "short");
    assert_eq!(docs[2]["remaining_secs"], 300);

    let listed = run_json(dir.path(), &["history", "list", "--json"]);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], docs[1]["session"]["id"]);

    let docs = run_json_stream(dir.path(), &["timer", "status"]);
    assert_eq!(docs.len(), 1);
    let listed = run_json(dir.path(), &["history", "list", "--json"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn timer_run_counts_down_and_shows_history() {
    let dir = TempDir::new().unwrap();
    let engine: TimerEngine = serde_json::from_value(json!({
        "policy": { "work_secs": 1500, "short_secs": 300, "long_secs": 900 },
        "mode": "work",
        "remaining_secs": 2,
        "running": false,
    }))
    .unwrap();
    seed_engine(dir.path(), &engine);

    let (stdout, stderr, code) = run_cli(dir.path(), &["timer", "run"]);
    assert_eq!(code, 0, "{stderr}");
    assert!(stdout.contains("Work 00:01"), "{stdout}");
    assert!(stdout.contains("Work complete, next: Short Break"), "{stdout}");
    assert!(stdout.contains("Session history\nWork\n  From "), "{stdout}");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["mode"], "short");
    assert_eq!(status["state"], "idle");
    let listed = run_json(dir.path(), &["history", "list", "--json"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
