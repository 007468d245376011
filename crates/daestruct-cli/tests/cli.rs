use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// x² + y² = 1, x'' = F x, y'' = F y - g over variables x, y, F.
fn write_pendulum(dir: &Path) -> PathBuf {
    let model = json!({
        "dimension": 3,
        "incidence": [
            {"equation": 0, "variable": 0, "derivative": 0},
            {"equation": 0, "variable": 1, "derivative": 0},
            {"equation": 1, "variable": 0, "derivative": 2},
            {"equation": 1, "variable": 2, "derivative": 0},
            {"equation": 2, "variable": 1, "derivative": 2},
            {"equation": 2, "variable": 2, "derivative": 0}
        ]
    });
    let path = dir.join("pendulum.json");
    fs::write(&path, serde_json::to_string_pretty(&model).unwrap()).unwrap();
    path
}

#[test]
fn test_analyse_table() {
    let tmp = tempdir().unwrap();
    let model = write_pendulum(tmp.path());
    Command::cargo_bin("daestruct")
        .unwrap()
        .args(["analyse", model.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("EQUATION"))
        .stdout(predicate::str::contains("VARIABLE"))
        .stdout(predicate::str::is_match(r"structural index\s+3").unwrap());
}

#[test]
fn test_analyse_json() {
    let tmp = tempdir().unwrap();
    let model = write_pendulum(tmp.path());
    let output = Command::cargo_bin("daestruct")
        .unwrap()
        .args(["analyse", model.to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["c"], json!([2, 0, 0]));
    assert_eq!(result["d"], json!([2, 2, 0]));
}

#[test]
fn test_analyse_with_config() {
    let tmp = tempdir().unwrap();
    let model = write_pendulum(tmp.path());
    let config = tmp.path().join("analysis.toml");
    fs::write(&config, "row_reduction_sweeps = 0\nverify_duals = true\n").unwrap();

    Command::cargo_bin("daestruct")
        .unwrap()
        .args([
            "analyse",
            model.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success();

    fs::write(&config, "row_reduction_sweeps = \"many\"\n").unwrap();
    Command::cargo_bin("daestruct")
        .unwrap()
        .args([
            "analyse",
            model.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing config"));
}

#[test]
fn test_analyse_singular_model() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("singular.json");
    let model = json!({
        "dimension": 2,
        "incidence": [
            {"equation": 0, "variable": 0, "derivative": 0},
            {"equation": 1, "variable": 0, "derivative": 1}
        ]
    });
    fs::write(&path, model.to_string()).unwrap();

    Command::cargo_bin("daestruct")
        .unwrap()
        .args(["analyse", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("singular"));
}

#[test]
fn test_stats() {
    let tmp = tempdir().unwrap();
    let model = write_pendulum(tmp.path());
    Command::cargo_bin("daestruct")
        .unwrap()
        .args(["stats", model.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Non-zeros       : 6"))
        .stdout(predicate::str::contains("Structural rank : 3"));
}

#[test]
fn test_missing_model() {
    Command::cargo_bin("daestruct")
        .unwrap()
        .args(["stats", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading model"));
}
