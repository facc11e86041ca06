use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tokentrace_testing::TestWorld;

// Nothing listens on the discard port, so no request ever succeeds.
const UNREACHABLE: &str = "[server]\nbase_url = \"http://127.0.0.1:9\"\nsubmit_timeout_ms = 2000\n";

#[test]
fn test_empty_prompt_rejected_before_sending() {
    let world = TestWorld::new().with_config(UNREACHABLE);

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["submit", "--prompt", " \u{200B} "]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Prompt cannot be empty"));
}

#[test]
fn test_invalid_sampling_rejected() {
    let world = TestWorld::new().with_config(UNREACHABLE);

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["submit", "--prompt", "hi", "--top-p", "1.5"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid sampling parameter top_p"));
}

#[test]
fn test_unknown_method_rejected_by_parser() {
    let world = TestWorld::new();

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["submit", "--prompt", "hi", "--method", "beam"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown sampling method"));
}

#[test]
fn test_unreachable_server_reports_connection_failure() {
    let world = TestWorld::new().with_config(UNREACHABLE);

    let mut cmd = cargo_bin_cmd!("tokentrace");
    world
        .configure_command(&mut cmd)
        .args(["submit", "--prompt", "Say lo!"]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
