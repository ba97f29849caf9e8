//! Local repository provider built on `git2`.
//!
//! There is no hosting API behind a local repository: releases resolve to
//! `None` and every pull-request operation reports
//! [`ProviderError::Unsupported`]. Only COMMIT mode can be served.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use git2::{Commit, Oid, Repository, Sort};
use std::path::PathBuf;
use tracing::debug;

use super::{Provider, ProviderResult, sort_newest_first};
use crate::error::ProviderError;
use crate::types::{CommitInfo, DiffInfo, PullRequestInfo, TagInfo};

/// Provider reading tags and commits straight from a repository on disk.
#[derive(Debug, Clone)]
pub struct LocalGitProvider {
    path: PathBuf,
}

impl LocalGitProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn open(&self) -> ProviderResult<Repository> {
        Ok(Repository::discover(&self.path)?)
    }
}

fn unsupported<T>(operation: &str) -> ProviderResult<T> {
    Err(ProviderError::Unsupported(format!(
        "{} requires a hosting platform; local repositories only support COMMIT mode",
        operation
    )))
}

fn commit_time(commit: &Commit<'_>) -> DateTime<Utc> {
    DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default()
}

fn to_commit_info(commit: &Commit<'_>) -> CommitInfo {
    let author = commit.author();
    CommitInfo {
        sha: commit.id().to_string(),
        message: commit.message().unwrap_or("").trim().to_string(),
        author: author.name().unwrap_or("Unknown").to_string(),
        date: commit_time(commit),
        url: None,
    }
}

fn resolve_commit<'r>(repo: &'r Repository, revision: &str) -> ProviderResult<Commit<'r>> {
    Ok(repo.revparse_single(revision)?.peel_to_commit()?)
}

fn read_tags(repo: &Repository, max_tags: usize) -> ProviderResult<Vec<TagInfo>> {
    let names = repo.tag_names(None)?;
    let mut tags = Vec::new();

    for name in names.iter().flatten() {
        let reference = match repo.find_reference(&format!("refs/tags/{}", name)) {
            Ok(r) => r,
            Err(_) => continue,
        };
        // tags pointing at trees or blobs are skipped
        let Ok(commit) = reference.peel_to_commit() else {
            continue;
        };
        tags.push(TagInfo::new(name, commit.id().to_string(), commit_time(&commit)));
    }

    sort_newest_first(&mut tags);
    tags.truncate(max_tags);
    Ok(tags)
}

fn read_annotation(repo: &Repository, tag: &str) -> ProviderResult<Option<String>> {
    let reference = match repo.find_reference(&format!("refs/tags/{}", tag)) {
        Ok(r) => r,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let Some(target) = reference.target() else {
        return Ok(None);
    };
    // lightweight tags point straight at a commit
    let object = repo.find_object(target, None)?;
    let Some(annotated) = object.as_tag() else {
        return Ok(None);
    };
    Ok(annotated
        .message()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty()))
}

/// Commits reachable from `head` but not from `base`, newest first.
fn range_oids(repo: &Repository, base: &str, head: &str) -> ProviderResult<Vec<Oid>> {
    let base_commit = resolve_commit(repo, base)?;
    let head_commit = resolve_commit(repo, head)?;

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    revwalk.push(head_commit.id())?;
    revwalk.hide(base_commit.id())?;
    Ok(revwalk.collect::<Result<Vec<_>, _>>()?)
}

fn read_commits(repo: &Repository, base: &str, head: &str) -> ProviderResult<Vec<CommitInfo>> {
    range_oids(repo, base, head)?
        .into_iter()
        .map(|oid| Ok(to_commit_info(&repo.find_commit(oid)?)))
        .collect()
}

fn read_diff(repo: &Repository, base: &str, head: &str) -> ProviderResult<DiffInfo> {
    let commits = read_commits(repo, base, head)?;

    let base_tree = resolve_commit(repo, base)?.tree()?;
    let head_tree = resolve_commit(repo, head)?.tree()?;
    let diff = repo.diff_tree_to_tree(Some(&base_tree), Some(&head_tree), None)?;
    let stats = diff.stats()?;

    Ok(DiffInfo {
        changed_files: stats.files_changed(),
        additions: stats.insertions(),
        deletions: stats.deletions(),
        changes: stats.insertions() + stats.deletions(),
        commits,
    })
}

#[async_trait]
impl Provider for LocalGitProvider {
    async fn get_tags(
        &self,
        _owner: &str,
        _repo: &str,
        max_tags: usize,
    ) -> ProviderResult<Vec<TagInfo>> {
        let repo = self.open()?;
        let tags = read_tags(&repo, max_tags)?;
        debug!("Read {} tags from {}", tags.len(), self.path.display());
        Ok(tags)
    }

    async fn get_tag_annotation(
        &self,
        _owner: &str,
        _repo: &str,
        tag: &str,
    ) -> ProviderResult<Option<String>> {
        read_annotation(&self.open()?, tag)
    }

    async fn get_latest_release(&self, _owner: &str, _repo: &str) -> ProviderResult<Option<String>> {
        Ok(None)
    }

    async fn get_diff_remote(
        &self,
        _owner: &str,
        _repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<DiffInfo> {
        read_diff(&self.open()?, base, head)
    }

    async fn get_for_commit_hash(
        &self,
        _owner: &str,
        _repo: &str,
        _sha: &str,
        _max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        unsupported("Pull request lookup")
    }

    async fn get_between_dates(
        &self,
        _owner: &str,
        _repo: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        _max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        unsupported("Pull request listing")
    }

    async fn get_open(
        &self,
        _owner: &str,
        _repo: &str,
        _max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        unsupported("Open pull request listing")
    }

    async fn get_commits(
        &self,
        _owner: &str,
        _repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<Vec<CommitInfo>> {
        read_commits(&self.open()?, base, head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};
    use std::path::Path;
    use tempfile::TempDir;

    /// Commits a file change at a fixed timestamp and returns the commit id.
    fn commit_at(repo: &Repository, file: &str, content: &str, message: &str, ts: i64) -> Oid {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(file), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::new("Test", "test@example.com", &Time::new(ts, 0)).unwrap();
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

    /// v1.0.0 (lightweight) -> two commits -> v1.1.0 (annotated)
    fn fixture() -> (TempDir, LocalGitProvider) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let first = commit_at(&repo, "a.txt", "one\n", "Initial commit", 1_700_000_000);
        repo.tag_lightweight("v1.0.0", &repo.find_object(first, None).unwrap(), false)
            .unwrap();

        commit_at(&repo, "a.txt", "one\ntwo\n", "Add second line", 1_700_000_100);
        let last = commit_at(&repo, "b.txt", "new\n", "Add b\n\nWith body", 1_700_000_200);
        let sig = Signature::new("Test", "test@example.com", &Time::new(1_700_000_300, 0)).unwrap();
        repo.tag(
            "v1.1.0",
            &repo.find_object(last, None).unwrap(),
            &sig,
            "Second release\n",
            false,
        )
        .unwrap();

        let provider = LocalGitProvider::new(dir.path().to_path_buf());
        (dir, provider)
    }

    #[tokio::test]
    async fn test_tags_newest_first() {
        let (_dir, provider) = fixture();
        let tags = provider.get_tags("", "", 1000).await.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["v1.1.0", "v1.0.0"]);

        let capped = provider.get_tags("", "", 1).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].name, "v1.1.0");
    }

    #[tokio::test]
    async fn test_annotation_only_for_annotated_tags() {
        let (_dir, provider) = fixture();
        assert_eq!(
            provider.get_tag_annotation("", "", "v1.1.0").await.unwrap().as_deref(),
            Some("Second release")
        );
        assert!(provider.get_tag_annotation("", "", "v1.0.0").await.unwrap().is_none());
        assert!(provider.get_tag_annotation("", "", "v9.9.9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commits_in_range() {
        let (_dir, provider) = fixture();
        let commits = provider.get_commits("", "", "v1.0.0", "v1.1.0").await.unwrap();
        let summaries: Vec<&str> = commits.iter().map(|c| c.summary()).collect();
        assert_eq!(summaries, vec!["Add b", "Add second line"]);
        assert_eq!(commits[0].author, "Test");
    }

    #[tokio::test]
    async fn test_diff_counts() {
        let (_dir, provider) = fixture();
        let diff = provider.get_diff_remote("", "", "v1.0.0", "v1.1.0").await.unwrap();
        assert_eq!(diff.commits.len(), 2);
        assert_eq!(diff.changed_files, 2);
        assert_eq!(diff.additions, 2);
        assert_eq!(diff.deletions, 0);
        assert_eq!(diff.changes, 2);
    }

    #[tokio::test]
    async fn test_no_releases_and_no_pull_requests() {
        let (_dir, provider) = fixture();
        assert!(provider.get_latest_release("", "").await.unwrap().is_none());

        let err = provider.get_open("", "", 10).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(_)));
        assert!(provider.get_for_commit_hash("", "", "abc", 10).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_ref_is_git_error() {
        let (_dir, provider) = fixture();
        let err = provider.get_commits("", "", "v0.0.1", "v1.1.0").await.unwrap_err();
        assert!(matches!(err, ProviderError::Git(_)));
    }
}
