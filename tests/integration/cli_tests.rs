//! Integration tests for the CLI binary.
//!
//! Drives the `pki` binary against temporary working directories.
//!
//! This test is registered as a [[test]] in the pki-trust-cli crate
//! so that CARGO_BIN_EXE_pki is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `pki` binary.
fn pki_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pki"))
}

/// Run `pki --dir DIR ARGS...`.
fn pki_in(dir: &Path, args: &[&str]) -> Output {
    pki_binary()
        .arg("--dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("failed to execute pki")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "pki should succeed, stderr: {}",
        stderr(output)
    );
}

#[test]
fn cli_responds_to_help() {
    let output = pki_binary()
        .arg("--help")
        .output()
        .expect("failed to execute pki --help");

    assert_success(&output);
    let stdout = stdout(&output);
    assert!(
        stdout.contains("pki") || stdout.contains("Usage"),
        "pki --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = pki_binary()
        .arg("--version")
        .output()
        .expect("failed to execute pki --version");

    assert_success(&output);
    let stdout = stdout(&output);
    assert!(
        stdout.contains("0.1") || stdout.contains("pki"),
        "pki --version should contain version info, got: {stdout}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = pki_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute pki");

    assert!(
        !output.status.success(),
        "pki with unknown flag should exit with error"
    );
}

#[test]
fn cli_init_then_index_roundtrip() {
    let dir = tempfile::tempdir().unwrap();

    let output = pki_in(dir.path(), &["init", "--org", "acme", "--admin", "alice"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Initialized organization 'acme'"));
    assert!(dir.path().join("pki.io.conf").exists());

    let output = pki_in(
        dir.path(),
        &["index", "add", "db-cert", "blob://abc", "--tags", "Prod, db"],
    );
    assert_success(&output);
    assert!(stdout(&output).contains("Added 'db-cert'"));

    let output = pki_in(dir.path(), &["index", "get", "db-cert"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "blob://abc");

    let output = pki_in(dir.path(), &["index", "list", "--tag", "prod"]);
    assert_success(&output);
    let listing = stdout(&output);
    assert!(listing.contains("db-cert"));
    assert!(listing.contains("blob://abc"));

    let output = pki_in(dir.path(), &["index", "list", "--json"]);
    assert_success(&output);
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows[0]["name"], "db-cert");
    assert_eq!(rows[0]["tags"], serde_json::json!(["db", "prod"]));

    let output = pki_in(dir.path(), &["index", "remove", "db-cert"]);
    assert_success(&output);

    let output = pki_in(dir.path(), &["index", "get", "db-cert"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("db-cert"));
}

#[test]
fn cli_org_show_public_and_private() {
    let dir = tempfile::tempdir().unwrap();
    assert_success(&pki_in(dir.path(), &["init", "--org", "acme"]));

    let output = pki_in(dir.path(), &["org", "show"]);
    assert_success(&output);
    let private = stdout(&output);
    assert!(private.contains("Organization: acme"));
    assert!(private.contains("Loaded from: private"));

    let output = pki_in(dir.path(), &["org", "show", "--public", "--verbose"]);
    assert_success(&output);
    let public = stdout(&output);
    assert!(public.contains("Loaded from: public"));
    assert!(public.contains("Private keys: not held"));
}

#[test]
fn cli_init_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert_success(&pki_in(dir.path(), &["init", "--org", "acme"]));

    let output = pki_in(dir.path(), &["init", "--org", "acme"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already initialized"));
}

#[test]
fn cli_uninitialized_directory_reports_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = pki_in(dir.path(), &["index", "list"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("could not load config"));
}

#[test]
fn cli_corrupted_index_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    assert_success(&pki_in(dir.path(), &["init", "--org", "acme"]));
    assert_success(&pki_in(dir.path(), &["index", "add", "db-cert", "blob://abc"]));

    // Locate the single stored index and break its signature.
    let private = dir.path().join("private");
    let index_path = std::fs::read_dir(&private)
        .unwrap()
        .map(|e| e.unwrap().path().join("index.json"))
        .find(|p| p.exists())
        .expect("index container should exist");
    let mut value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&index_path).unwrap()).unwrap();
    let signature = value["signature"].as_str().unwrap().to_string();
    let flipped = if signature.starts_with('A') { "B" } else { "A" };
    value["signature"] = serde_json::Value::String(format!("{flipped}{}", &signature[1..]));
    std::fs::write(&index_path, serde_json::to_vec(&value).unwrap()).unwrap();

    let output = pki_in(dir.path(), &["index", "get", "db-cert"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("could not load index"), "got: {err}");
    assert!(err.contains("verify index"), "got: {err}");
    assert_eq!(err.matches("Signature mismatch").count(), 1, "got: {err}");
}
