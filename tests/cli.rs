use std::process::Command;

use assert_cmd::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn dockwright(store: &TempDir) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("dockwright");
    let mut cmd = Command::new(bin);
    cmd.env_remove("RUST_LOG")
        .args(["--store", store.path().to_str().unwrap(), "--output", "json"]);
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn import_then_match_uses_the_stored_profiles() {
    let store = TempDir::new().unwrap();

    let listed = json_stdout(dockwright(&store).args([
        "profiles",
        "--import",
        "tests/fixtures/profiles.yaml",
    ]));
    let ids: Vec<_> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["notes", "notes-fallback"]);

    let matched = json_stdout(dockwright(&store).args(["match", "https://notes.example/thread/42"]));
    assert_eq!(matched["tier"], "domain_and_path");
    assert_eq!(matched["profile"]["id"], "notes");

    let fallback = json_stdout(dockwright(&store).args(["match", "https://eu.notes.example/inbox"]));
    assert_eq!(fallback["profile"]["id"], "notes-fallback");
}

#[test]
fn empty_store_lists_builtin_profiles() {
    let store = TempDir::new().unwrap();
    let listed = json_stdout(dockwright(&store).arg("profiles"));
    let ids: Vec<_> = listed
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert!(ids.contains(&"chatgpt"));
    assert!(ids.contains(&"gmail-compose"));
}

#[test]
fn locate_reports_heuristic_winner() {
    let store = TempDir::new().unwrap();
    let report = json_stdout(dockwright(&store).args([
        "locate",
        "--page",
        "tests/fixtures/notes_page.json",
    ]));
    assert_eq!(report["found"]["element"], "textarea#reply");
    assert_eq!(report["found"]["source"]["kind"], "heuristic");
    assert_eq!(report["candidates"].as_array().unwrap().len(), 1);
}

#[test]
fn watch_mounts_on_chatgpt_fixture() {
    let store = TempDir::new().unwrap();
    let snapshot = json_stdout(dockwright(&store).args([
        "watch",
        "--page",
        "tests/fixtures/chatgpt_page.json",
        "--for",
        "600ms",
    ]));
    assert_eq!(snapshot["state"], "mounted");
    assert_eq!(snapshot["strategy"], "chatgpt");
    assert_eq!(snapshot["profileId"], "chatgpt");
    assert_eq!(snapshot["controlAttached"], true);
}

#[test]
fn malformed_fixture_fails() {
    let store = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("broken.json");
    std::fs::write(&page, "{ not json").unwrap();
    dockwright(&store)
        .args(["locate", "--page", page.to_str().unwrap()])
        .assert()
        .failure();
}
