//! Integration tests for the `booking` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to run every subcommand
//! against a fixture schedule, covering file and stdin input, JSON output,
//! and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper: path to the schedule.json fixture.
fn schedule_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/schedule.json")
}

/// Helper: read the schedule.json fixture as a string.
fn schedule_json() -> String {
    std::fs::read_to_string(schedule_path()).expect("schedule.json fixture must exist")
}

/// Helper: a scratch file path unique to one test.
fn scratch_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("booking-cli-{}-{}", std::process::id(), name))
}

/// Helper: run the binary and parse its stdout as JSON.
fn run_json(args: &[&str]) -> Value {
    let output = Command::cargo_bin("booking")
        .unwrap()
        .args(args)
        .output()
        .expect("binary must run");
    assert!(
        output.status.success(),
        "booking {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

fn ids(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|entry| entry["id"].as_str().expect("id"))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// labels
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn labels_prints_the_grid() {
    Command::cargo_bin("booking")
        .unwrap()
        .arg("labels")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0\t7:00\n"))
        .stdout(predicate::str::contains("6\t8:00\n"))
        .stdout(predicate::str::contains("83\t20:50\n"));
}

// ─────────────────────────────────────────────────────────────────────────────
// available
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn available_respects_weekday_absence() {
    let blocked = run_json(&[
        "available", "-i", schedule_path(), "--therapist", "t1",
        "--date", "19.10.2026", "--start", "9:30", "--end", "10:00",
    ]);
    assert_eq!(blocked["available"], false);

    let adjacent = run_json(&[
        "available", "-i", schedule_path(), "--therapist", "t1",
        "--date", "2026-10-19", "--start", "10:00", "--end", "10:30",
    ]);
    assert_eq!(adjacent["available"], true);
}

#[test]
fn available_accepts_grid_indices() {
    let value = run_json(&[
        "available", "-i", schedule_path(), "--therapist", "t1",
        "--date", "2026-10-19", "--start", "15", "--end", "18",
    ]);
    assert_eq!(value["start"], "9:30");
    assert_eq!(value["available"], false);
}

#[test]
fn unknown_therapist_is_never_available() {
    let value = run_json(&[
        "available", "-i", schedule_path(), "--therapist", "ghost",
        "--date", "2026-10-20", "--start", "8:00", "--end", "8:30",
    ]);
    assert_eq!(value["available"], false);
}

// ─────────────────────────────────────────────────────────────────────────────
// conflicts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn conflicts_report_singles_and_series() {
    let check = run_json(&[
        "conflicts", "-i", schedule_path(), "--therapist", "t1",
        "--date", "2026-11-02", "--start", "10:00", "--end", "10:30",
    ]);
    assert_eq!(check["therapist_known"], true);
    assert_eq!(check["therapist_available"], true);
    assert_eq!(ids(&check["single_conflicts"]), vec!["single-cleo"]);
    assert_eq!(ids(&check["series_conflicts"]), vec!["series-anna"]);
}

#[test]
fn cancelled_series_occurrence_is_not_a_conflict() {
    let check = run_json(&[
        "conflicts", "-i", schedule_path(), "--therapist", "t1",
        "--date", "26.10.2026", "--start", "10:00", "--end", "10:30",
    ]);
    assert!(check["series_conflicts"].as_array().unwrap().is_empty());
    assert!(check["single_conflicts"].as_array().unwrap().is_empty());
}

#[test]
fn conflicts_skip_the_edited_appointment() {
    let check = run_json(&[
        "conflicts", "-i", schedule_path(), "--therapist", "t1",
        "--date", "2026-10-20", "--start", "12:30", "--end", "13:30", "--id", "single-ben",
    ]);
    assert!(check["single_conflicts"].as_array().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// series-conflicts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn series_conflicts_find_future_singles() {
    let value = run_json(&[
        "series-conflicts", "-i", schedule_path(), "--today", "2026-10-19",
        "--therapist", "t1", "--weekday", "Montag", "--start", "10:00", "--end", "10:30",
        "--from", "2026-10-19", "--to", "2026-11-09",
    ]);
    assert_eq!(ids(&value), vec!["single-cleo"]);
}

#[test]
fn series_conflicts_honour_interval() {
    // Bi-weekly from 26.10. probes 26.10. and 09.11., never 02.11.
    let value = run_json(&[
        "series-conflicts", "-i", schedule_path(), "--today", "2026-10-19",
        "--therapist", "t1", "--weekday", "monday", "--start", "10:00", "--end", "10:30",
        "--from", "2026-10-26", "--to", "2026-11-09", "--interval", "2",
    ]);
    assert!(value.as_array().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// patient
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn patient_lists_upcoming_appointments() {
    let value = run_json(&[
        "patient", "-i", schedule_path(), "--today", "2026-10-19", "--name", "Ben",
    ]);
    assert_eq!(ids(&value), vec!["single-ben"]);
    assert_eq!(value[0]["date"], "2026-10-20");

    let later = run_json(&[
        "patient", "-i", schedule_path(), "--today", "2027-01-01", "--name", "Ben",
    ]);
    assert!(later.as_array().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// suggest
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn suggest_avoids_booked_slots() {
    let value = run_json(&[
        "suggest", "-i", schedule_path(), "--patient", "Anna", "--therapist", "t1",
        "--duration", "30", "--time-of-day", "timeframe2",
        "--from", "2026-10-20", "--to", "2026-10-20",
    ]);
    let suggestions = value.as_array().unwrap();
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0]["startTime"], "13:00");
    assert!(suggestions.iter().all(|s| s["therapist"] == "Tina"));
    assert!(suggestions.iter().all(|s| s["patient"] == "Anna"));
}

#[test]
fn suggest_with_off_grid_duration_is_empty() {
    let value = run_json(&[
        "suggest", "-i", schedule_path(), "--patient", "Anna", "--therapist", "t1",
        "--duration", "15", "--from", "2026-10-20", "--to", "2026-10-20",
    ]);
    assert!(value.as_array().unwrap().is_empty());
}

#[test]
fn suggest_writes_to_output_file() {
    let output_path = scratch_path("suggest.json");
    let _ = std::fs::remove_file(&output_path);

    Command::cargo_bin("booking")
        .unwrap()
        .args([
            "suggest", "-i", schedule_path(), "--patient", "Anna", "--therapist", "t1",
            "--duration", "60", "--time-of-day", "timeframe3",
            "--from", "2026-10-21", "--to", "2026-10-21", "-o",
        ])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    let value: Value = serde_json::from_str(&content).unwrap();
    assert!(!value.as_array().unwrap().is_empty());
    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn suggest_rejects_unknown_time_of_day() {
    Command::cargo_bin("booking")
        .unwrap()
        .args([
            "suggest", "-i", schedule_path(), "--patient", "Anna", "--therapist", "t1",
            "--duration", "30", "--time-of-day", "evening",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown time of day"));
}

// ─────────────────────────────────────────────────────────────────────────────
// normalize
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn normalize_stdin_to_stdout() {
    Command::cargo_bin("booking")
        .unwrap()
        .arg("normalize")
        .write_stdin(schedule_json())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"weekday\": \"Montag\""))
        .stdout(predicate::str::contains("\"date\": \"26.10.2026\""))
        .stdout(predicate::str::contains("single-blank").not());
}

#[test]
fn normalize_file_to_file() {
    let output_path = scratch_path("normalized.json");
    let _ = std::fs::remove_file(&output_path);

    Command::cargo_bin("booking")
        .unwrap()
        .args(["normalize", "-i", schedule_path(), "-o"])
        .arg(&output_path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    let value: Value = serde_json::from_str(&content).unwrap();
    let days = value["daylist"]["elements"].as_array().unwrap();
    assert_eq!(days[0]["date"], "2026-10-20");
    assert_eq!(ids(&days[0]["appointments"]), vec!["single-ben"]);
    assert_eq!(value["masterlist"]["elements"][0]["appointments"][0]["startDate"], "2026-10-19");
    assert_eq!(value["therapists"][0]["activeSince"], -1);
    let _ = std::fs::remove_file(&output_path);
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors and global flags
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn missing_input_file_fails() {
    Command::cargo_bin("booking")
        .unwrap()
        .args(["patient", "-i", "/nonexistent/schedule.json", "--name", "Ben"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load schedule"));
}

#[test]
fn malformed_json_fails() {
    Command::cargo_bin("booking")
        .unwrap()
        .arg("normalize")
        .write_stdin("{ not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load schedule"));
}

#[test]
fn off_grid_time_is_rejected() {
    Command::cargo_bin("booking")
        .unwrap()
        .args([
            "available", "-i", schedule_path(), "--therapist", "t1",
            "--date", "2026-10-19", "--start", "8:15", "--end", "9:00",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("8:15"));
}

#[test]
fn invalid_config_fails() {
    let config_path = scratch_path("config.json");
    std::fs::write(&config_path, r#"{"max_search_days": 0}"#).unwrap();

    Command::cargo_bin("booking")
        .unwrap()
        .args(["patient", "-i", schedule_path(), "--name", "Ben", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
    let _ = std::fs::remove_file(&config_path);
}

#[test]
fn config_file_is_applied() {
    let config_path = scratch_path("relieve.json");
    std::fs::write(&config_path, r#"{"timezone": "Europe/Berlin", "exception_policy": "relieve"}"#)
        .unwrap();

    let value = run_json(&[
        "available", "--config", config_path.to_str().unwrap(), "-i", schedule_path(),
        "--therapist", "t1", "--date", "2026-10-19", "--start", "9:00", "--end", "9:30",
    ]);
    // No exceptions are stored, so the absence still blocks.
    assert_eq!(value["available"], false);
    let _ = std::fs::remove_file(&config_path);
}

#[test]
fn verbose_logging_goes_to_stderr() {
    Command::cargo_bin("booking")
        .unwrap()
        .env_remove("RUST_LOG")
        .args(["-vv", "patient", "-i", schedule_path(), "--name", "Ben"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["))
        .stderr(predicate::str::contains("schedule loaded"));
}

#[test]
fn no_subcommand_prints_usage() {
    Command::cargo_bin("booking")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
