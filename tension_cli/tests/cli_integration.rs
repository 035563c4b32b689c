use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML with short holds and a fast tick so runs finish quickly
// on the simulated rig.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[driver]
samples_per_tick = 1
dead_band_g = 2.0
sample_rate_hz = 200
stride_coarse = 10
stride_fine = 5

[phases]
overtension_stage_g = 350.0
overtension_g = 400.0
overtension_hold_ms = 50
staging_g = 300.0
final_approach_g = 319.0
final_hold_ms = 50
final_g = 322.0

[timeouts]
sensor_ms = 50

[safety]
max_motion_ms = 30000
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["auto"], 0, "accepted", "stdout")]
#[case(&["release"], 0, "accepted", "stdout")]
#[case(&["final-tension"], 0, "accepted", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("tension_cli").unwrap();
    cmd.arg("--config").arg(&cfg);
    cmd.env("TENSION_SIM_BIAS_G", "0.0");
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn implausible_sensor_aborts_with_stable_exit_code() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    // A huge negative disagreement pushes every frequency reading below the
    // plausibility window.
    let mut cmd = Command::cargo_bin("tension_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("auto")
        .env("TENSION_SIM_BIAS_G", "-2000.0");

    cmd.assert()
        .code(4)
        .stderr(predicate::str::contains("invalid tension"));
}

#[rstest]
fn measure_does_not_move_the_stage() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    // The stage starts at zero; the bias alone puts the reading in range.
    let mut cmd = Command::cargo_bin("tension_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("measure")
        .env("TENSION_SIM_BIAS_G", "318.0");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("318.0 gf"));
}

#[rstest]
fn rejected_config_names_the_offending_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        r#"
[driver]
sample_rate_hz = 0
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("tension_cli").unwrap();
    cmd.arg("--config").arg(&path).arg("self-check");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("sample_rate_hz"));
}

#[rstest]
fn accepted_run_appends_a_jsonl_record() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let records = dir.path().join("records.jsonl");

    let mut cmd = Command::cargo_bin("tension_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--records")
        .arg(&records)
        .arg("--operator")
        .arg("reinhard")
        .arg("--tube-id")
        .arg("MSU00123")
        .arg("auto")
        .env("TENSION_SIM_BIAS_G", "0.0");
    cmd.assert().success();

    let text = fs::read_to_string(&records).unwrap();
    let line = text.lines().next().expect("one record line");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON record");
    assert!(v.get("tension_g").and_then(|x| x.as_f64()).is_some());
    assert!(v.get("frequency_hz").and_then(|x| x.as_f64()).is_some());
    assert!(v.get("measured_at").and_then(|x| x.as_str()).is_some());
    assert_eq!(v.get("operator").and_then(|x| x.as_str()), Some("reinhard"));
    assert_eq!(v.get("tube_id").and_then(|x| x.as_str()), Some("MSU00123"));
}

#[rstest]
fn sample_log_captures_the_motion_profile() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let samples = dir.path().join("samples.csv");

    let mut cmd = Command::cargo_bin("tension_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--samples-csv")
        .arg(&samples)
        .arg("auto")
        .env("TENSION_SIM_BIAS_G", "0.0");
    cmd.assert().success();

    let text = fs::read_to_string(&samples).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("elapsed_ms,tension_g"));
    // Over-tension alone needs dozens of ticks; the log must reflect that.
    assert!(text.lines().count() > 20, "too few samples:\n{text}");
}
