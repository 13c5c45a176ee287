use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal sim config with fast timings so a cycle completes in well under a second.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
# pins are unused in sim backend but must be present
hx711_dt = 5
hx711_sck = 6
motor_fwd = 20
motor_rev = 21

[timing]
sample_interval_ms = 10
display_interval_ms = 50
tare_timeout_ms = 500
finished_dwell_ms = 100
loop_period_ms = 1

[simulation]
flow_rate_gps = 400.0
tare_latency_ms = 20
sample_rate_hz = 100
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["dispense", "--grams", "5"], 0, "dispense complete", "stdout")]
#[case(&["dispense", "--keys", "9*7.5#"], 0, "dispense complete", "stdout")]
#[case(&["dispense"], 2, "required", "stderr")]
#[case(&["dispense", "--grams", "5", "--keys", "5#"], 2, "cannot be used with", "stderr")]
#[case(&["dispense", "--grams", "0"], 1, "invalid target", "stderr")]
#[case(&["dispense", "--grams", "1234567"], 1, "cannot be typed", "stderr")]
#[case(&["dispense", "--keys", "12"], 1, "never finalizes", "stderr")]
#[case(&["self-check"], 0, "self-check ok (sim)", "stdout")]
#[case(&["health"], 0, "\"status\":\"ok\"", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("dispenser").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
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
fn dispensed_mass_reaches_the_target() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = Command::cargo_bin("dispenser")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["dispense", "--grams", "12.5"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let grams: f32 = stdout
        .lines()
        .find_map(|l| l.strip_prefix("dispense complete: "))
        .and_then(|rest| rest.trim_end_matches(" g").parse().ok())
        .unwrap_or_else(|| panic!("no completion line in {stdout}"));
    assert!(grams >= 12.5, "{grams}");
}

#[rstest]
fn missing_config_file_is_explained() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("dispenser")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("health")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "What happened: The config file could not be read",
        ));
}

#[rstest]
#[case::no_pins("[timing]\nloop_period_ms = 1\n")]
#[case::same_motor_pins("[pins]\nhx711_dt = 5\nhx711_sck = 6\nmotor_fwd = 20\nmotor_rev = 20\n")]
#[case::bad_band(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\nmotor_fwd = 20\nmotor_rev = 21\n\
     [control]\nnear_target_g = 600.0\nfine_band_g = 500.0\n"
)]
fn invalid_config_is_explained(#[case] toml: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    Command::cargo_bin("dispenser")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "What happened: Configuration is invalid",
        ));
}

#[rstest]
fn bad_sim_rate_override_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    Command::cargo_bin("dispenser")
        .unwrap()
        .env("DISPENSER_SIM_RATE_GPS", "fast")
        .arg("--config")
        .arg(&cfg)
        .args(["dispense", "--grams", "5"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DISPENSER_SIM_RATE_GPS"));
}
