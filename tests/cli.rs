//! Exit-status contract of the daemon binary. None of these invocations
//! get far enough to open a device node.

use std::process::{Command, Output};

fn akmd(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_akmd"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn unknown_model_exits_with_usage() {
    let out = akmd(&["nexus", "8", "0"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Usage"), "stdout: {stdout}");
    assert!(stdout.contains("nexus"), "stdout: {stdout}");
}

#[test]
fn missing_arguments_exit_with_usage() {
    let out = akmd(&[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage"));
}

#[test]
fn bad_number_exits_with_usage() {
    let out = akmd(&["hero", "loud", "0"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage"));
}

#[test]
fn help_exits_cleanly() {
    let out = akmd(&["--help"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("hero"));
    assert!(stdout.contains("jordan"));
}
