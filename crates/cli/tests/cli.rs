//! End-to-end tests of the `team-kit` binary against the bundled templates.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

fn team_kit(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("team-kit").unwrap();
    cmd.arg("--root").arg(root.path()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn initialized() -> TempDir {
    let dir = tempdir().unwrap();
    team_kit(&dir).arg("init").assert().success();
    dir
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = initialized();
    assert!(dir.path().join(".team-kit/teams/review-chat.yaml").exists());

    team_kit(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    team_kit(&dir).args(["init", "--force", "--minimal"]).assert().success();
}

#[test]
fn test_commands_without_project_fail() {
    let dir = tempdir().unwrap();
    team_kit(&dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("team-kit init"));
}

#[test]
fn test_list_and_validate() {
    let dir = initialized();

    team_kit(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("travel_agent"))
        .stdout(predicate::str::contains("review-chat"));

    team_kit(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn test_validate_reports_unknown_tool() {
    let dir = initialized();
    std::fs::write(
        dir.path().join(".team-kit/agents/writer.md"),
        "---\nname: writer\ndescription: d\nmodel: m\ntools: [teleport]\n---\nWrite.\n",
    )
    .unwrap();

    team_kit(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("teleport"));
}

#[test]
fn test_graph_prints_dot() {
    let dir = initialized();
    team_kit(&dir)
        .args(["graph", "travel-desk"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph"))
        .stdout(predicate::str::contains("flights_refunder"));
}

#[test]
fn test_run_review_chat_until_done() {
    let dir = initialized();
    team_kit(&dir)
        .args(["run", "review-chat", "--task", "Write a slogan for a seaside town"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reviewer: DONE"))
        .stdout(predicate::str::contains("satisfied after 4 turns"));
}

#[test]
fn test_run_calculator_as_json() {
    let dir = initialized();
    let output = team_kit(&dir)
        .args(["run", "calculator", "--task", "What is 2 + 3?", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let events: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(events.first().unwrap()["type"], "runStarted");
    let last = events.last().unwrap();
    assert_eq!(last["type"], "runFinished");
    assert_eq!(last["payload"]["status"], "satisfied");
    assert_eq!(last["payload"]["turns"], 1);

    let tool_result = events
        .iter()
        .find(|e| e["payload"]["message"]["role"] == "tool")
        .unwrap();
    assert_eq!(tool_result["payload"]["message"]["content"], "5");
}

#[test]
fn test_run_travel_desk_asks_the_user() {
    let dir = initialized();
    team_kit(&dir)
        .args(["run", "travel-desk", "--task", "I want a refund for my flight"])
        .write_stdin("IJI325\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("waiting for your reply"))
        .stdout(predicate::str::contains("Flight IJI325 refunded"))
        .stdout(predicate::str::contains("satisfied"));
}

#[test]
fn test_run_unknown_team() {
    let dir = initialized();
    team_kit(&dir)
        .args(["run", "nope", "--task", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown team 'nope'"));
}
