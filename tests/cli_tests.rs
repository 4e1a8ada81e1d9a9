//! Integration tests for the riskcall binary

mod common;

use common::two_caller_module;
use predicates::prelude::*;
use riskcall::ir::Module;
use riskcall::runtime::{ProfileReport, ProfileTable};
use std::fs;
use tempfile::TempDir;

fn write_module(dir: &TempDir, module: &Module) -> std::path::PathBuf {
    let path = dir.path().join("module.json");
    fs::write(&path, module.to_json_string().unwrap()).unwrap();
    path
}

#[test]
fn test_instrument_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = write_module(&dir, &two_caller_module());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("instrument").arg(&input);

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Instrumented strcpy in function A"));
    assert!(stderr.contains("Instrumented strcpy in function B"));
    assert!(stderr.contains("modified: true"));

    let module = Module::from_json_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert!(module.function("profiling_log").is_some());
}

#[test]
fn test_instrument_to_file() {
    let dir = TempDir::new().unwrap();
    let input = write_module(&dir, &two_caller_module());
    let out = dir.path().join("out.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("instrument").arg(&input).arg("-o").arg(&out);
    cmd.assert().success().stdout(predicate::str::is_empty());

    let module = Module::from_file(&out).unwrap();
    assert_eq!(module.globals.len(), 3);
}

#[test]
fn test_instrument_without_matches() {
    let dir = TempDir::new().unwrap();
    let input = write_module(&dir, &Module::new("empty"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("instrument").arg(&input);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("modified: false"))
        .stderr(predicate::str::contains("Instrumented").not());
}

#[test]
fn test_instrument_with_config() {
    let dir = TempDir::new().unwrap();
    let input = write_module(&dir, &two_caller_module());
    let config = dir.path().join("riskcall.toml");
    fs::write(&config, "[instrument]\ntargets = [\"gets\"]\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("instrument").arg(&input).arg("--config").arg(&config);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("modified: false"));
}

#[test]
fn test_instrument_print() {
    let dir = TempDir::new().unwrap();
    let input = write_module(&dir, &two_caller_module());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("instrument").arg(&input).arg("--print");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("call @profiling_log(@.str, @.str.1)"));
}

#[test]
fn test_instrument_unknown_pass() {
    let dir = TempDir::new().unwrap();
    let input = write_module(&dir, &two_caller_module());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("instrument").arg(&input).arg("--passes").arg("inline");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown pass 'inline'"));
}

#[test]
fn test_instrument_missing_input() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("instrument").arg("/nonexistent/module.json");
    cmd.assert().failure();
}

#[test]
fn test_summary_command() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dangerous_api_profile.json");

    let table = ProfileTable::new(8);
    table.log_call("strcpy", "A");
    table.log_call("strcpy", "A");
    table.log_call("strcpy", "B");
    ProfileReport::from_table(&table).write_to_path(&path).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("summary").arg(&path).arg("--limit").arg("1");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("=== Dangerous API Profiling Results ==="))
        .stdout(predicate::str::contains("Total dangerous API calls: 3"))
        .stdout(predicate::str::contains("A() -> strcpy: 2 calls (66.7%)"))
        .stdout(predicate::str::contains("B() -> strcpy").not());
}

#[test]
fn test_summary_rejects_bad_report() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("summary").arg(&path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load report"));
}

#[test]
fn test_instrument_required_only_keeps_required_pass() {
    let dir = TempDir::new().unwrap();
    let input = write_module(&dir, &two_caller_module());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("riskcall");
    cmd.arg("instrument").arg(&input).arg("--required-only");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("modified: true"));
}
