//! CLI tests for `saga-runner run` and `saga-runner verify`.
//!
//! Spawns the binary inside a temporary directory and checks exit codes and
//! printed output for passing, failing, raising and invalid scenarios.

use std::process::{Command, Output};

use saga_runner::exit_codes;
use saga_runner::test_support::{ScenarioDir, fetch_user_scenario};
use serde_json::{Value, json};

fn saga_runner(dir: &ScenarioDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_saga-runner"))
        .current_dir(dir.path())
        .args(args)
        .output()
        .expect("spawn saga-runner")
}

#[test]
fn verify_passing_scenario_exits_ok() {
    let dir = ScenarioDir::new().expect("tempdir");
    dir.write_scenario("fetch.json", &fetch_user_scenario())
        .expect("write");

    let output = saga_runner(&dir, &["verify", "fetch.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok fetch.json (2 checks)"), "stdout: {}", stdout);
}

#[test]
fn verify_failing_expectation_exits_failed() {
    let dir = ScenarioDir::new().expect("tempdir");
    let mut scenario = fetch_user_scenario();
    scenario["expect"]["returns"] = json!("grace");
    dir.write_scenario("fetch.json", &scenario).expect("write");

    let output = saga_runner(&dir, &["verify", "fetch.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Assertion failure"), "stdout: {}", stdout);
    assert!(stdout.contains("Expected return value"), "stdout: {}", stdout);
}

#[test]
fn verify_uncaught_error_exits_raised() {
    let dir = ScenarioDir::new().expect("tempdir");
    let mut scenario = fetch_user_scenario();
    scenario["substitutions"][0]["values"] = json!([
        { "inject_error": { "error": { "class": "NotFound", "message": "no user 1" } } }
    ]);
    dir.write_scenario("fetch.json", &scenario).expect("write");

    let output = saga_runner(&dir, &["verify", "fetch.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::RAISED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("NotFound: no user 1"));
}

#[test]
fn verify_reports_the_highest_code_across_scenarios() {
    let dir = ScenarioDir::new().expect("tempdir");
    dir.write_scenario("pass.json", &fetch_user_scenario())
        .expect("write");
    dir.write("broken.json", "{ not json").expect("write");

    let output = saga_runner(&dir, &["verify", "pass.json", "broken.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stdout).contains("ok pass.json"));
}

#[test]
fn unused_substitutions_are_invalid() {
    let dir = ScenarioDir::new().expect("tempdir");
    let mut scenario = fetch_user_scenario();
    scenario["substitutions"][0]["values"] = json!([{ "value": "ada" }, { "value": "grace" }]);
    dir.write_scenario("fetch.json", &scenario).expect("write");

    let output = saga_runner(&dir, &["run", "fetch.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unused mapped values"));
}

#[test]
fn run_prints_output_as_json() {
    let dir = ScenarioDir::new().expect("tempdir");
    dir.write_scenario("fetch.json", &fetch_user_scenario())
        .expect("write");

    let output = saga_runner(&dir, &["run", "fetch.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let printed: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(printed["return"], json!("ada"));
    assert_eq!(printed["effects"][1]["type"], json!("PUT"));
}

#[test]
fn config_limits_the_effect_ceiling() {
    let dir = ScenarioDir::new().expect("tempdir");
    let ticking = json!({
        "script": { "body": [{ "repeat": [{ "effect": { "type": "TAKE", "payload": "TICK" } }] }] }
    });
    dir.write_scenario("ticking.json", &ticking).expect("write");
    dir.write("tight.toml", "max_effects = 3\n").expect("write");

    let output = saga_runner(&dir, &["--config", "tight.toml", "run", "ticking.json"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Too many yielded effects"));
}
