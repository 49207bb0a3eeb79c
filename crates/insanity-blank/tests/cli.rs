//! Command-line tests for the blank sample test.

use assert_cmd::cargo;
use predicates::prelude::*;

#[test]
fn metadata_document() {
    let out = cargo::cargo_bin_cmd!("insanity-test-blank")
        .arg("--insanity-metadata")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(doc["__name__"], "blank-test");
    assert_eq!(doc["__full_description__"], "some longer description");
    assert!(doc["__checklist__"]["random-checklist-item"].is_object());
    assert!(doc["__checklist__"]["random-other-checklist-item"].is_object());
    assert_eq!(doc["__arguments__"]["some-int"]["type"], "int");
    assert_eq!(doc["__arguments__"]["some-int"]["default"]["value"], 123);
    assert_eq!(doc["__arguments__"]["uri"]["global"], true);
    assert_eq!(doc["__output_files__"]["dummy-output-file"]["global"], false);
    assert_eq!(doc["__output_files__"]["dummy-output-file-global"]["global"], true);
    assert!(doc["__extra_infos__"]["random-extra-info"].is_string());
}

#[test]
fn standalone_run_passes() {
    let dir = tempfile::tempdir().unwrap();
    cargo::cargo_bin_cmd!("insanity-test-blank")
        .arg("--run")
        .arg("--output-directory")
        .arg(dir.path())
        .arg("some-int=7")
        .assert()
        .success()
        .stdout(predicate::str::contains("step: random-checklist-item: PASS"))
        .stdout(predicate::str::contains("Extra info: random-extra-info: Foo"))
        .stdout(predicate::str::contains("random-other-checklist-item: PASS"))
        .stdout(predicate::str::contains("0/2 failed tests"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn unconvertible_argument_fails() {
    cargo::cargo_bin_cmd!("insanity-test-blank")
        .arg("--run")
        .arg("some-int=lots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("some-int"));
}

#[test]
fn remote_mode_needs_a_bus_address() {
    cargo::cargo_bin_cmd!("insanity-test-blank")
        .env_remove("PRIVATE_DBUS_ADDRESS")
        .arg("--run")
        .arg("--dbus-uuid=abc")
        .assert()
        .failure();
}

#[test]
fn nothing_to_do_is_a_failure() {
    cargo::cargo_bin_cmd!("insanity-test-blank").assert().failure();
}
