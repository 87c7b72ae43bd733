mod common;
use common::*;

const SMALL_RUN: [&str; 4] = ["--chunk-size", "4096", "--total-bytes", "262144"];

fn run_args<'a>(extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec!["run"];
    args.extend_from_slice(&SMALL_RUN);
    args.extend_from_slice(extra);
    args
}

#[test]
fn memory_self_test_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = sdprobe_ok(dir.path(), &run_args(&["--backend", "memory"]));
    assert!(stdout.contains("Write time (ms)"), "{stdout}");
    assert!(stdout.contains("Write rate (MB/s)"), "{stdout}");
    assert!(stdout.contains("Read  time (ms)"), "{stdout}");
    assert!(stdout.contains("Read  rate (MB/s)"), "{stdout}");
    assert!(!stdout.contains("Fail"), "{stdout}");
}

#[test]
fn disk_run_cleans_up_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().to_str().unwrap();
    sdprobe_ok(dir.path(), &run_args(&["--dir", card]));
    assert!(!dir.path().join("_PPTEST_.DAT").exists());
}

#[test]
fn keep_leaves_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().to_str().unwrap();
    sdprobe_ok(dir.path(), &run_args(&["--dir", card, "--keep"]));
    let artifact = dir.path().join("_PPTEST_.DAT");
    assert_eq!(std::fs::metadata(artifact).unwrap().len(), 262_144);
}

#[test]
fn json_report_is_machine_readable() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = sdprobe_ok(
        dir.path(),
        &run_args(&["--backend", "memory", "--seed", "77", "--json"]),
    );
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("run --json should produce valid JSON");
    assert_eq!(parsed["result"]["status"], "success");
    assert_eq!(parsed["code"], 1);
    assert_eq!(parsed["seed"], 77);
    assert_eq!(parsed["stats"]["write"]["count"], 64);
    assert_eq!(parsed["stats"]["read"]["bytes"], 262_144);
    assert!(parsed["stats"]["mismatch"].is_null());
}

#[test]
fn random_seed_is_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = sdprobe_ok(
        dir.path(),
        &run_args(&["--backend", "memory", "--random-seed", "--json"]),
    );
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_ne!(parsed["seed"].as_u64().unwrap(), 0);
}

#[test]
fn seed_and_random_seed_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let out = sdprobe_in(
        dir.path(),
        &run_args(&["--backend", "memory", "--seed", "3", "--random-seed"]),
    );
    assert!(!out.status.success());
}

#[test]
fn invalid_plan_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().to_str().unwrap();
    let (_, stderr) = sdprobe_fails(
        dir.path(),
        &["run", "--dir", card, "--chunk-size", "4095"],
    );
    assert!(stderr.contains("invalid test plan"), "{stderr}");
    assert!(!dir.path().join("_PPTEST_.DAT").exists());
}

#[test]
fn zero_seed_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr) = sdprobe_fails(dir.path(), &run_args(&["--backend", "memory", "--seed", "0"]));
    assert!(stderr.contains("seed"), "{stderr}");
}

#[test]
fn missing_card_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("not-mounted");
    let (_, stderr) = sdprobe_fails(dir.path(), &run_args(&["--dir", gone.to_str().unwrap()]));
    assert!(stderr.contains("not a directory"), "{stderr}");
}

#[test]
fn config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("sdprobe.toml"),
        r#"
[test]
file_name = "PROBE.BIN"
chunk_size = 1024
total_bytes = 65536
seed = 5
cleanup = "never"
"#,
    )
    .unwrap();
    let stdout = sdprobe_ok(dir.path(), &["run", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["seed"], 5);
    assert_eq!(parsed["stats"]["write"]["count"], 64);
    assert_eq!(
        std::fs::metadata(dir.path().join("PROBE.BIN")).unwrap().len(),
        65_536
    );
}

#[test]
fn flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("custom.toml");
    std::fs::write(&cfg, "[test]\nseed = 5\n\n[storage]\nbackend = \"fs\"\n").unwrap();
    let stdout = sdprobe_ok(
        dir.path(),
        &run_args(&[
            "--config",
            cfg.to_str().unwrap(),
            "--backend",
            "memory",
            "--seed",
            "9",
            "--json",
        ]),
    );
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["seed"], 9);
    assert!(!dir.path().join("_PPTEST_.DAT").exists());
}

#[test]
fn config_prints_effective_settings() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("sdprobe.toml"),
        "[storage]\nbackend = \"memory\"\n",
    )
    .unwrap();
    let stdout = sdprobe_ok(dir.path(), &["config"]);
    assert!(stdout.contains("backend = \"memory\""), "{stdout}");
    assert!(stdout.contains("chunk_size = 16384"), "{stdout}");
    assert!(stdout.contains("cleanup = \"on-success\""), "{stdout}");
}

#[test]
fn config_with_unknown_key_fails_with_line() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sdprobe.toml"), "[test]\nchunk = 4\n").unwrap();
    let (_, stderr) = sdprobe_fails(dir.path(), &["config"]);
    assert!(stderr.contains("sdprobe.toml"), "{stderr}");
    assert!(stderr.contains("line 2"), "{stderr}");
}

#[test]
fn progress_line_stays_off_piped_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let out = sdprobe_in(dir.path(), &run_args(&["--backend", "memory"]));
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(!stderr.contains('\r'), "{stderr:?}");
    assert!(!stderr.contains('\x1b'), "{stderr:?}");
    assert!(!stderr.contains("writing"), "{stderr:?}");
}
