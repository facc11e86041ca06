use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tokentrace_testing::fixtures::two_session_trace;
use tokentrace_testing::{TestWorld, assertions};

fn metrics_json(world: &TestWorld, args: &[&str]) -> serde_json::Value {
    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .arg("metrics")
        .arg("run.jsonl")
        .arg("--format")
        .arg("json")
        .args(args);
    let output = cmd.output().expect("Failed to run metrics");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("Invalid JSON output")
}

#[test]
fn test_metrics_over_all_sessions() {
    let world = TestWorld::new().with_trace("run.jsonl", &two_session_trace());
    let json = metrics_json(&world, &[]);

    assert_eq!(json["total_tokens"], 3);
    assert_eq!(json["latency_samples"], 3);
    assertions::assert_number(&json, "average_latency_ms", 41.67).unwrap();
    assert_eq!(json["model"]["n_layer"], 32);
    assert_eq!(json["time_series"].as_array().unwrap().len(), 2);
}

#[test]
fn test_metrics_for_one_session() {
    let world = TestWorld::new().with_trace("run.jsonl", &two_session_trace());
    let json = metrics_json(&world, &["--session", "sess_a"]);

    assert_eq!(json["session_id"], "sess_a");
    assert_eq!(json["total_tokens"], 2);
    assertions::assert_number(&json, "average_latency_ms", 50.0).unwrap();
    assertions::assert_number(&json, "tokens_per_second", 20.0).unwrap();
}

#[test]
fn test_metrics_window_limits_buckets() {
    let world = TestWorld::new().with_trace("run.jsonl", &two_session_trace());
    let json = metrics_json(&world, &["--window", "1"]);

    let series = json["time_series"].as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["label"], "22:28");
}

#[test]
fn test_metrics_unknown_session_fails() {
    let world = TestWorld::new().with_trace("run.jsonl", &two_session_trace());

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["metrics", "run.jsonl", "--session", "missing"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Session not found: missing"));
}
