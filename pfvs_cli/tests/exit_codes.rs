//! Failures surface as stable exit codes with a human explanation on stderr.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn write_config(dir: &tempfile::TempDir, simulation: &str) -> PathBuf {
    let refs = Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/reference_spectra.csv");
    fs::copy(&refs, dir.path().join("refs.csv")).unwrap();
    let toml = format!(
        "[classifier]\nreferences = \"refs.csv\"\n\n[stream]\nsample_ms = 20\n\n[simulation]\n{simulation}\n"
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case("filament_present = false", &["self-check"], 5, "No filament detected")]
#[case("filament_present = false", &["stream", "--duration-ms", "100"], 5, "No filament detected")]
#[case("read_fault_after = 0", &["scan"], 3, "Sensor read failed")]
#[case("read_fault_after = 0", &["self-check"], 3, "simulated spectrometer fault")]
#[case("read_fault_after = 2", &["stream", "--duration-ms", "500"], 3, "Sensor read failed")]
fn sensor_failures_map_to_exit_codes(
    #[case] simulation: &str,
    #[case] args: &[&str],
    #[case] code: i32,
    #[case] needle: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, simulation);

    Command::cargo_bin("pfvs_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(args)
        .assert()
        .code(code)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn unprintable_material_cancels_with_exit_6() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    Command::cargo_bin("pfvs_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["replay", "--material", "asa"])
        .arg(fixture("wrong_nozzle_temp.gcode"))
        .assert()
        .code(6)
        .stdout(predicate::str::contains("state: cancelled (ASA is not printable"))
        .stdout(predicate::str::contains("host: pauses=1 resumes=0 cancels=1 commands=0"))
        .stderr(predicate::str::contains("The print was cancelled"));
}

#[test]
fn failed_verification_scan_leaves_print_paused() {
    // the load scan takes 4 reads, so the first verification scan faults
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "read_fault_after = 4");

    Command::cargo_bin("pfvs_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg(fixture("wrong_nozzle_temp.gcode"))
        .assert()
        .success()
        .stdout(predicate::str::contains("state: paused_for_verify"))
        .stdout(predicate::str::contains("host: pauses=1 resumes=0 cancels=0"));
}
