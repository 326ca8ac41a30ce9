//! E2E workflow tests for the `pt` binary.
//!
//! Each test runs `pt` as a subprocess in an isolated temp directory with its
//! own store and no user config.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn pt_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pt"));
    cmd.current_dir(dir);
    cmd.env("HOME", dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("PLANTRACK_USER");
    cmd.env_remove("PLANTRACK_TOKEN");
    cmd.env_remove("FORMAT");
    cmd.env("PLANTRACK_LOG", "error");
    cmd
}

fn as_alice(dir: &Path) -> Command {
    let mut cmd = pt_cmd(dir);
    cmd.env("PLANTRACK_USER", "alice");
    cmd
}

fn json_of(cmd: &mut Command) -> Value {
    let output = cmd.arg("--json").output().expect("pt should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

const RECORDS: &str = r#"[
  {"planning_id": 4411, "planning_title": "N20 Bypass", "planning_stage": "Tender",
   "planning_category": "Roads & Transport", "planning_value": "€12,500,000",
   "planning_county": "Cork", "planning_application_date": "2024-01-15"},
  {"docId": "school-7", "title": "School extension", "stage": "Planning",
   "category": "Education", "value": 3000000},
  {"title": "No identifier here"}
]"#;

fn seeded_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("records.json"), RECORDS).expect("write records");
    let imported = json_of(pt_cmd(dir.path()).args(["project", "import", "records.json"]));
    assert_eq!(imported["imported"], serde_json::json!(["4411", "school-7"]));
    assert_eq!(imported["skipped"], serde_json::json!([2]));
    dir
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[test]
fn project_show_resolves_display_fields() {
    let dir = seeded_dir();
    pt_cmd(dir.path())
        .args(["project", "show", "4411"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Title\tN20 Bypass"))
        .stdout(predicate::str::contains("Value\t€12,500,000"))
        .stdout(predicate::str::contains("Application Date\t15 Jan 2024"))
        .stdout(predicate::str::contains("Decision Date\tN/A"));
}

#[test]
fn unknown_project_fails_with_code() {
    let dir = seeded_dir();
    pt_cmd(dir.path())
        .args(["project", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));
}

// ---------------------------------------------------------------------------
// Tracking
// ---------------------------------------------------------------------------

#[test]
fn track_list_untrack_cycle() {
    let dir = seeded_dir();

    let tracked = json_of(as_alice(dir.path()).args(["track", "4411"]));
    assert_eq!(tracked["newly_tracked"], true);
    let again = json_of(as_alice(dir.path()).args(["track", "4411"]));
    assert_eq!(again["newly_tracked"], false);

    let list = json_of(as_alice(dir.path()).arg("tracked"));
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["title"], "N20 Bypass");

    let first = json_of(as_alice(dir.path()).args(["untrack", "4411"]));
    assert_eq!(first["removed"], true);
    let second = json_of(as_alice(dir.path()).args(["untrack", "4411"]));
    assert_eq!(second["removed"], false);
}

#[test]
fn tracking_requires_a_user() {
    let dir = seeded_dir();
    pt_cmd(dir.path())
        .args(["track", "4411"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"))
        .stderr(predicate::str::contains("PLANTRACK_USER"));
}

#[test]
fn users_do_not_see_each_others_projects() {
    let dir = seeded_dir();
    as_alice(dir.path()).args(["track", "school-7"]).assert().success();

    let bob = json_of(pt_cmd(dir.path()).args(["--user", "bob", "tracked"]));
    assert_eq!(bob, serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[test]
fn note_lifecycle() {
    let dir = seeded_dir();

    let note = json_of(as_alice(dir.path()).args([
        "note",
        "add",
        "4411",
        "  Called the council  ",
    ]));
    let note_id = note["id"].as_str().expect("note id").to_string();
    assert_eq!(note["text"], "Called the council");

    json_of(as_alice(dir.path()).args(["note", "edit", &note_id, "Council called back"]));
    let notes = json_of(as_alice(dir.path()).args(["notes", "4411"]));
    assert_eq!(notes[0]["text"], "Council called back");

    let deleted = json_of(as_alice(dir.path()).args(["note", "rm", &note_id]));
    assert_eq!(deleted["deleted"], true);
    let deleted = json_of(as_alice(dir.path()).args(["note", "rm", &note_id]));
    assert_eq!(deleted["deleted"], false);
}

#[test]
fn empty_and_oversized_notes_are_rejected() {
    let dir = seeded_dir();
    as_alice(dir.path())
        .args(["note", "add", "4411", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2004"));

    let long = "x".repeat(501);
    as_alice(dir.path())
        .args(["note", "add", "4411", &long])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2005"));
}

#[test]
fn note_limit_comes_from_config() {
    let dir = seeded_dir();
    let state = dir.path().join(".plantrack");
    std::fs::write(state.join("config.toml"), "[notes]\nmax_chars = 5\n").expect("config");

    as_alice(dir.path())
        .args(["note", "add", "4411", "too long"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<= 5 characters"));
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[test]
fn dashboard_summarizes_tracked_projects() {
    let dir = seeded_dir();
    as_alice(dir.path()).args(["track", "4411"]).assert().success();
    as_alice(dir.path()).args(["track", "school-7"]).assert().success();

    let dash = json_of(as_alice(dir.path()).args(["dashboard", "--refresh"]));
    assert_eq!(dash["project_count"], 2);
    assert_eq!(dash["total_value_display"], "€15,500,000");
    assert_eq!(dash["top_status"]["status"], "Tender");
    assert_eq!(dash["from_cache"], true);
    assert_eq!(
        dash["project_distribution"]["labels"],
        serde_json::json!(["Tender", "Planning"])
    );

    let cached = json_of(as_alice(dir.path()).arg("dashboard"));
    assert_eq!(cached["value_distribution"], dash["value_distribution"]);

    as_alice(dir.path()).args(["untrack", "school-7"]).assert().success();
    let after = json_of(as_alice(dir.path()).arg("dashboard"));
    assert_eq!(after["from_cache"], false);
    assert_eq!(after["project_count"], 1);
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[test]
fn profile_without_token_fails_before_network() {
    let dir = TempDir::new().expect("tempdir");
    as_alice(dir.path())
        .args(["profile", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no API token"));
}
