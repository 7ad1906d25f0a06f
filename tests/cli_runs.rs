//! CLI integration tests for the `mapbrush runs` command.

use std::process::Command;

/// Run `mapbrush runs` and return (stdout, exit code).
fn run_runs(shape: &str) -> (String, Option<i32>) {
    let output = Command::new(env!("CARGO_BIN_EXE_mapbrush"))
        .args(["runs", shape])
        .output()
        .expect("Failed to execute mapbrush");
    (String::from_utf8_lossy(&output.stdout).to_string(), output.status.code())
}

#[test]
fn test_runs_rect_is_one_run() {
    let (stdout, code) = run_runs(r#"{kind: "rect", a: [5, 5], b: [2, 2]}"#);
    assert_eq!(code, Some(0));
    assert_eq!(stdout, "(2,2)-(5,5)\n");
}

#[test]
fn test_runs_thin_line() {
    let (stdout, code) = run_runs(r#"{"kind": "line", "from": [0, 0], "to": [4, 0]}"#);
    assert_eq!(code, Some(0));
    assert_eq!(stdout, "(0,0)-(4,0)\n");
}

#[test]
fn test_runs_circle_radius_zero() {
    let (stdout, _) = run_runs(r#"{kind: "circle", centre: [3, 4], radius: 0}"#);
    assert_eq!(stdout, "(3,4)-(3,4)\n");
}

#[test]
fn test_runs_invalid_shape() {
    let (stdout, code) = run_runs(r#"{kind: "hexagon"}"#);
    assert_eq!(code, Some(2));
    assert!(stdout.is_empty());
}
