use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tokentrace_testing::TestWorld;
use tokentrace_testing::fixtures::{hello_trace, two_session_trace};

fn replay_json(world: &TestWorld, args: &[&str]) -> serde_json::Value {
    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .arg("replay")
        .arg("run.jsonl")
        .arg("--instant")
        .arg("--format")
        .arg("json")
        .args(args);
    let output = cmd.output().expect("Failed to run replay");
    assert!(
        output.status.success(),
        "replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("Invalid JSON output")
}

#[test]
fn test_instant_replay_of_hello_trace() {
    let world = TestWorld::new().with_trace("run.jsonl", &hello_trace());
    let json = replay_json(&world, &[]);

    assert_eq!(json["session_id"], "S1");
    assert_eq!(json["status"], "completed");
    assert_eq!(json["generated_text"], "lo!");
    assert_eq!(json["steps_played"], 2);
    assert_eq!(json["delay_ms"], 2000);
    assert_eq!(json["virtual_duration_ms"], 4000);
}

#[test]
fn test_speed_shortens_delay() {
    let world = TestWorld::new().with_trace("run.jsonl", &hello_trace());
    let json = replay_json(&world, &["--speed", "5"]);

    assert_eq!(json["delay_ms"], 400);
    assert_eq!(json["virtual_duration_ms"], 800);
}

#[test]
fn test_delay_floor_from_config() {
    let world = TestWorld::new()
        .with_trace("run.jsonl", &hello_trace())
        .with_config("[playback]\nfloor_delay_ms = 500\n");
    let json = replay_json(&world, &["--speed", "100"]);

    assert_eq!(json["delay_ms"], 500);
}

#[test]
fn test_operator_sampling_marks_eliminated_candidates() {
    let world = TestWorld::new().with_trace("run.jsonl", &two_session_trace());
    let json = replay_json(&world, &["--session", "sess_a", "--method", "top-k", "--top-k", "1"]);

    assert_eq!(json["generated_text"], "The cat");
    let first = &json["snapshots"][0];
    assert_eq!(first["label"], "Top-K (k=1)");
    assert_eq!(first["candidates"][0]["eliminated"], false);
    assert_eq!(first["candidates"][1]["eliminated"], true);
    assert_eq!(first["layer_time_us"], 200);
    assert_eq!(first["layers"][0]["layer_type"], "attention");
}

#[test]
fn test_invalid_speed_is_rejected() {
    let world = TestWorld::new().with_trace("run.jsonl", &hello_trace());

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["replay", "run.jsonl", "--instant", "--speed", "0"]);
    cmd.assert().failure().stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_unknown_session_fails() {
    let world = TestWorld::new().with_trace("run.jsonl", &hello_trace());

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["replay", "run.jsonl", "--instant", "--session", "nope"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Session not found: nope"));
}

#[test]
fn test_instant_plain_output() {
    let world = TestWorld::new().with_trace("run.jsonl", &hello_trace());

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["replay", "run.jsonl", "--instant"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Generated: lo!"))
        .stdout(predicate::str::contains("2 steps at 1x"));
}
