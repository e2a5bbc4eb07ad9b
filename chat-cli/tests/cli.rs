//! Offline command tests for the chat-cli binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("chat-cli").unwrap();
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

#[test]
fn init_prints_normalized_phone() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["init", "--phone", "34 600 000 001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+34600000001"));

    assert!(dir.path().join("config.json").exists());
}

#[test]
fn init_rejects_invalid_phone() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["init", "--phone", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid phone number"));
}

#[test]
fn commands_require_init() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .arg("conversations")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not initialized"));
}

#[test]
fn contacts_roundtrip() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["contact", "+34600000002", "Bob"])
        .assert()
        .success();

    cli(dir.path())
        .arg("contacts")
        .assert()
        .success()
        .stdout(predicate::str::contains("+34600000002  Bob"));
}

#[test]
fn empty_profile_has_no_conversations() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["init", "--phone", "+1111"])
        .assert()
        .success();

    cli(dir.path())
        .arg("conversations")
        .assert()
        .success()
        .stdout(predicate::str::contains("No conversations yet"));

    cli(dir.path())
        .args(["history", "+2222"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No messages with +2222"));
}

#[test]
fn send_requires_content() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["init", "--phone", "+1111"])
        .assert()
        .success();

    cli(dir.path())
        .args(["send", "+2222"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Must specify text"));
}
