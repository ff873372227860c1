//! Binary-level checks for the history command

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_history_list_on_empty_store() {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("history.db");

    let mut cmd = Command::cargo_bin("confab").expect("binary built");
    cmd.arg("--db").arg(&db).arg("history").arg("list");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No conversation history found."));
}

#[test]
fn test_unknown_subcommand_fails() {
    let mut cmd = Command::cargo_bin("confab").expect("binary built");
    cmd.arg("dance");
    cmd.assert().failure();
}
