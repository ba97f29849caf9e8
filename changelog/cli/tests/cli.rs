use assert_cmd::cargo::cargo_bin_cmd;
use git2::{Commit, Oid, Repository, Signature, Time};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

fn commit_at(repo: &Repository, file: &str, content: &str, message: &str, ts: i64) -> Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(file), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("Tester", "tester@example.com", &Time::new(ts, 0)).unwrap();
    let parents: Vec<Commit<'_>> = repo
        .head()
        .ok()
        .and_then(|h| h.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Repository with v1.0.0, two commits, then v1.1.0 (annotated).
fn tagged_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    let first = commit_at(&repo, "a.txt", "one\n", "Initial commit", 1_700_000_000);
    repo.tag_lightweight("v1.0.0", &repo.find_object(first, None).unwrap(), false)
        .unwrap();
    commit_at(&repo, "a.txt", "one\ntwo\n", "Add second line", 1_700_000_100);
    let last = commit_at(&repo, "b.txt", "b\n", "Add b", 1_700_000_200);
    let sig = Signature::new("Tester", "tester@example.com", &Time::new(1_700_000_300, 0)).unwrap();
    repo.tag(
        "v1.1.0",
        &repo.find_object(last, None).unwrap(),
        &sig,
        "Release notes\n",
        false,
    )
    .unwrap();

    dir
}

fn untagged_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_at(&repo, "a.txt", "one\n", "Initial commit", 1_700_000_000);
    dir
}

fn changelog(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("changelog");
    cmd.env_clear()
        .arg("--repository-path")
        .arg(dir.path())
        .args(["--platform", "git", "--mode", "COMMIT"]);
    cmd
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    cargo_bin_cmd!("changelog")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Generate release changelogs"))
        .stdout(predicate::str::contains("--from-tag"))
        .stdout(predicate::str::contains("--fail-on-error"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("changelog")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("changelog"));
}

// ============================================================================
// Local Repository Runs
// ============================================================================

#[test]
fn test_commit_mode_on_local_repo() {
    let dir = tagged_repo();
    changelog(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "## Other Changes\n\n- Add b\n- Add second line",
        ))
        .stdout(predicate::str::contains("Initial commit").not());
}

#[test]
fn test_offset_and_annotation() {
    let dir = tagged_repo();
    changelog(&dir)
        .args(["--from-tag", "-1", "--fetch-tag-annotations"])
        .args(["--configuration-json", r##"{"template": "#{{TAG_ANNOTATION}}|#{{CHANGELOG}}"}"##])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Release notes|## Other Changes"));
}

#[test]
fn test_inputs_from_action_variables() {
    let dir = tagged_repo();
    changelog(&dir)
        .env("INPUT_PREFIXMESSAGE", "# Release v1.1.0")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Release v1.1.0\n## Other Changes"));
}

#[test]
fn test_json_outputs() {
    let dir = tagged_repo();
    let output = changelog(&dir).arg("--json").output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["fromTag"], "v1.0.0");
    assert_eq!(json["toTag"], "v1.1.0");
    assert_eq!(json["owner"], "local");
    assert_eq!(json["contributors"], "Tester");
    assert_eq!(json["pullRequests"], "");
    assert_eq!(json["failed"], false);
}

#[test]
fn test_github_output_file() {
    let dir = tagged_repo();
    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("output.txt");

    changelog(&dir)
        .env("GITHUB_OUTPUT", &out_file)
        .assert()
        .success();

    let written = std::fs::read_to_string(&out_file).unwrap();
    assert!(written.contains("changelog<<ghadelimiter_"));
    assert!(written.contains("\nv1.1.0\n"));
    assert!(written.contains("failed<<"));
    assert!(written.contains("\nfalse\n"));
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn test_missing_tags_prints_fallback() {
    let dir = untagged_repo();
    changelog(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "⚠️ No tags found in repository\n\n- no changes",
        ));
}

#[test]
fn test_fail_on_error_sets_exit_code() {
    let dir = untagged_repo();
    changelog(&dir)
        .arg("--fail-on-error")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No tags found in repository"));
}

#[test]
fn test_fail_on_error_from_action_variable() {
    let dir = untagged_repo();
    changelog(&dir)
        .env("INPUT_FAILONERROR", "true")
        .assert()
        .failure()
        .stdout(predicate::str::contains("No tags found in repository"));
}

#[test]
fn test_verbose_enables_debug_logs() {
    let dir = tagged_repo();
    changelog(&dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("Provider returned").not());

    changelog(&dir)
        .env("INPUT_VERBOSE", "true")
        .assert()
        .success()
        .stderr(predicate::str::contains("Provider returned 2 tags"));
}

#[test]
fn test_pr_mode_rejected_on_local_platform() {
    let dir = tagged_repo();
    cargo_bin_cmd!("changelog")
        .env_clear()
        .arg("--repository-path")
        .arg(dir.path())
        .args(["--platform", "git", "--mode", "PR", "--fail-on-error"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "PR and HYBRID modes are not supported for git platform. Use COMMIT mode instead.",
        ));
}

#[test]
fn test_invalid_number_input() {
    let dir = tagged_repo();
    changelog(&dir)
        .args(["--max-tags-to-fetch", "lots"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "⚠️ Changelog generation failed: Invalid maxTagsToFetch: lots. Must be a number.",
        ));
}
