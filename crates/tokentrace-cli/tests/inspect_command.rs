use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tokentrace_testing::fixtures::{hello_trace, two_session_trace};
use tokentrace_testing::{TestWorld, assertions};

fn inspect_json(world: &TestWorld, file: &str) -> serde_json::Value {
    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .arg("inspect")
        .arg(file)
        .arg("--format")
        .arg("json");
    let output = cmd.output().expect("Failed to run inspect");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("Invalid JSON output")
}

#[test]
fn test_inspect_lists_sessions() {
    let world = TestWorld::new().with_trace("run.jsonl", &two_session_trace());
    let json = inspect_json(&world, "run.jsonl");

    assertions::assert_session_count(&json, 2).unwrap();
    assertions::assert_session_status(&json, "sess_a", "completed").unwrap();
    assertions::assert_session_status(&json, "sess_b", "active").unwrap();
}

#[test]
fn test_inspect_counts_malformed_lines() {
    let text = format!("{}not-json\n\n", hello_trace().build());
    let world = TestWorld::new().with_log_text("run.jsonl", &text);
    let json = inspect_json(&world, "run.jsonl");

    assert_eq!(json["report"]["parsed"], 4);
    assert_eq!(json["report"]["malformed"], 1);
    assert_eq!(json["report"]["blank"], 1);
    assertions::assert_session_status(&json, "S1", "completed").unwrap();
    assert_eq!(json["sessions"][0]["generated_text"], "lo!");
    assert_eq!(json["sessions"][0]["layer_time_us"], 400);
}

#[test]
fn test_inspect_verbose_lists_issues() {
    let world = TestWorld::new().with_log_text("run.jsonl", "[1,2]\n");

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .arg("inspect")
        .arg("run.jsonl")
        .arg("--verbose");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 malformed"))
        .stdout(predicate::str::contains("No sessions found"))
        .stdout(predicate::str::contains("line 0: expected a JSON object"));
}

#[test]
fn test_inspect_plain_output() {
    let world = TestWorld::new().with_trace("run.jsonl", &hello_trace());

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world.configure_command(&mut cmd).arg("inspect").arg("run.jsonl");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("S1  completed"))
        .stdout(predicate::str::contains("prompt:  Say lo!"));
}

#[test]
fn test_inspect_missing_file_fails() {
    let world = TestWorld::new();

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world.configure_command(&mut cmd).arg("inspect").arg("absent.jsonl");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Failed to read"));
}

#[test]
fn test_rust_log_reaches_stderr_only() {
    let text = format!("{}not-json\n", hello_trace().build());
    let world = TestWorld::new()
        .with_log_text("run.jsonl", &text)
        .with_env("RUST_LOG", "debug");

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["inspect", "run.jsonl", "--format", "json"]);
    let output = cmd.output().expect("Failed to run inspect");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("skipping malformed line"));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("Invalid JSON output");
    assert_eq!(json["report"]["malformed"], 1);
}
