//! Shared helpers for driving the `sdprobe` binary.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

/// Run sdprobe in `dir` with logging left at its default.
pub fn sdprobe_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sdprobe"))
        .args(args)
        .current_dir(dir)
        .env_remove("SDPROBE_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to run sdprobe {}: {e}", args.join(" ")))
}

/// Run sdprobe and assert it succeeds. Returns stdout as string.
pub fn sdprobe_ok(dir: &Path, args: &[&str]) -> String {
    let out = sdprobe_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "sdprobe {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run sdprobe and assert it fails. Returns (stdout, stderr).
pub fn sdprobe_fails(dir: &Path, args: &[&str]) -> (String, String) {
    let out = sdprobe_in(dir, args);
    assert!(
        !out.status.success(),
        "Expected sdprobe {} to fail, but it succeeded.\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
    );
    assert_eq!(out.status.code(), Some(1));
    (
        String::from_utf8_lossy(&out.stdout).to_string(),
        String::from_utf8_lossy(&out.stderr).to_string(),
    )
}
