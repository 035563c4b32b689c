use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[driver]
samples_per_tick = 1
dead_band_g = 2.0
sample_rate_hz = 200
stride_coarse = 10
stride_fine = 5

[phases]
overtension_hold_ms = 50
final_hold_ms = 50

[timeouts]
sensor_ms = 50

[safety]
max_motion_ms = 30000
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn outcome_line(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .find(|l| l.contains("\"accepted\""))
        .unwrap_or_else(|| panic!("no outcome line found; stdout was: {text}"));
    serde_json::from_str(line).expect("valid JSON")
}

/// Validate the outcome schema for an accepted run.
#[rstest]
fn json_accept_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("tension_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("auto")
        .env("TENSION_SIM_BIAS_G", "0.0");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = outcome_line(&out);

    assert_eq!(v.get("command").and_then(|x| x.as_str()), Some("auto"));
    assert_eq!(v.get("accepted").and_then(|x| x.as_bool()), Some(true));
    assert!(v.get("tension_g").and_then(|x| x.as_f64()).is_some());
    assert!(v.get("frequency_hz").and_then(|x| x.as_f64()).is_some());
    assert!(v.get("duration_ms").and_then(|x| x.as_u64()).is_some());
    assert!(v.get("abort_reason").is_some_and(|x| x.is_null()));
}

/// Validate the outcome schema for an aborted run, including the reason name.
#[rstest]
fn json_abort_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("tension_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("auto")
        .env("TENSION_SIM_BIAS_G", "-2000.0");

    let out = cmd.assert().code(4).get_output().stdout.clone();
    let v = outcome_line(&out);

    assert_eq!(v.get("accepted").and_then(|x| x.as_bool()), Some(false));
    assert_eq!(
        v.get("abort_reason").and_then(|x| x.as_str()),
        Some("SensorImplausible")
    );
}
