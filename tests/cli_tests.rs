//! Command-line behavior that can be checked without reaching GitHub.

mod common;

use common::*;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_help_lists_subcommands() {
    let assert = eng_bump_cmd().arg("--help").assert().success();
    let mut stdout = predicate::str::contains("eng-sync").boxed();
    for command in ["bump-msbuild", "sdk-versions", "bump-emsdk", "mono-addin"] {
        stdout = stdout.and(predicate::str::contains(command)).boxed();
    }
    assert.stdout(stdout);
}

#[test]
fn test_missing_subcommand_fails() {
    eng_bump_cmd().assert().failure();
}

#[test]
fn test_mono_addin_prints_record() {
    let temp = TempDir::new().unwrap();
    let artifacts = write_file(temp.path(), "artifacts.json", ARTIFACTS_JSON);

    eng_bump_cmd()
        .arg("mono-addin")
        .arg(&artifacts)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("commit = {}", ARTIFACT_COMMIT)))
        .stdout(predicate::str::contains(r#""productId": "964ebddd-1ffe-47e7-8128-5ce17ffffb05""#))
        .stdout(predicate::str::contains(r#""repo": "git@github.com:mono/mono""#))
        .stdout(predicate::str::contains(r#""uploaded": true"#));
}

#[test]
fn test_mono_addin_writes_output_file() {
    let temp = TempDir::new().unwrap();
    let artifacts = write_file(temp.path(), "artifacts.json", ARTIFACTS_JSON);
    let output = temp.path().join("external.json");

    eng_bump_cmd()
        .arg("mono-addin")
        .arg(&artifacts)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(record["commit"], ARTIFACT_COMMIT);
    assert_eq!(record["version"], "6.12.0.90");
    assert_eq!(record["size"], 305872896);
    assert_eq!(record["tag"], "");
}

#[test]
fn test_mono_addin_rejects_empty_listing() {
    let temp = TempDir::new().unwrap();
    let artifacts = write_file(temp.path(), "artifacts.json", "[]");

    eng_bump_cmd()
        .arg("mono-addin")
        .arg(&artifacts)
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty listing"));
}

#[test]
fn test_mono_addin_missing_file() {
    let temp = TempDir::new().unwrap();

    eng_bump_cmd()
        .arg("mono-addin")
        .arg(temp.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error reading"));
}

#[test]
fn test_bump_msbuild_requires_working_dir() {
    eng_bump_cmd()
        .args(["bump-msbuild", "--git-user-name", "radical", "-n"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--mono-working-dir required"));
}

#[test]
fn test_bump_msbuild_rejects_non_numeric_pr() {
    let temp = TempDir::new().unwrap();

    eng_bump_cmd()
        .args(["bump-msbuild", "abc", "--git-user-name", "radical", "-n", "--allow-dirty"])
        .arg("--mono-working-dir")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("should be a number"));
}

#[test]
fn test_bump_msbuild_requires_token_unless_dry_run() {
    let temp = TempDir::new().unwrap();

    eng_bump_cmd()
        .args(["bump-msbuild", "--git-user-name", "radical", "--allow-dirty"])
        .arg("--mono-working-dir")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("personal access token required"));
}

#[test]
fn test_bump_msbuild_requires_user() {
    let temp = TempDir::new().unwrap();

    eng_bump_cmd()
        .args(["bump-msbuild", "-n"])
        .arg("--mono-working-dir")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("remote user name are required"));
}

#[test]
fn test_bump_msbuild_rejects_missing_working_dir() {
    let temp = TempDir::new().unwrap();

    eng_bump_cmd()
        .args(["bump-msbuild", "--git-user-name", "radical", "-n"])
        .arg("--mono-working-dir")
        .arg(temp.path().join("mono"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn test_bad_repo_slug_is_rejected() {
    let temp = TempDir::new().unwrap();

    eng_bump_cmd()
        .args(["bump-msbuild", "--git-user-name", "radical", "-n", "--mono-repo", "mono"])
        .arg("--mono-working-dir")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be of the form owner/name"));
}

#[test]
fn test_eng_sync_push_requires_path() {
    eng_bump_cmd()
        .args(["eng-sync", "--push"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MSBUILD_DIR"));
}

#[test]
fn test_eng_sync_rejects_bad_toolset_repo() {
    eng_bump_cmd()
        .args(["eng-sync", "--toolset-repo", "dotnet/toolset/extra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--toolset-repo"));
}

#[test]
fn test_bump_emsdk_requires_working_dir() {
    eng_bump_cmd()
        .args(["bump-emsdk", "--git-user-name", "radical", "-n"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--runtime-working-dir required"));
}
