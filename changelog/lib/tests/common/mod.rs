//! In-memory provider shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use changelog_lib::providers::{Provider, ProviderResult};
use changelog_lib::{CommitInfo, DiffInfo, ProviderError, PullRequestInfo, TagInfo};

/// Provider answering from fixed data and recording which calls were made.
///
/// The commit range is ignored: every range returns `commits`.
#[derive(Debug, Default)]
pub struct MockProvider {
    pub tags: Vec<TagInfo>,
    pub latest_release: Option<String>,
    pub latest_release_fails: bool,
    pub annotations: HashMap<String, String>,
    pub commits: Vec<CommitInfo>,
    pub pulls_by_sha: HashMap<String, Vec<PullRequestInfo>>,
    pub open: Vec<PullRequestInfo>,
    pub calls: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Tags named newest-first, one day apart.
    pub fn with_tags(names: &[&str]) -> Self {
        Self {
            tags: tags(names),
            ..Self::default()
        }
    }

    pub fn called(&self, operation: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == operation)
    }

    /// Recorded calls that start with `prefix`, in call order.
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }
}

fn base_date() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).unwrap()
}

pub fn tags(names: &[&str]) -> Vec<TagInfo> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| TagInfo::new(*name, format!("sha-{}", name), base_date() - Duration::days(i as i64)))
        .collect()
}

pub fn commit(sha: &str, message: &str, author: &str) -> CommitInfo {
    CommitInfo {
        sha: sha.to_string(),
        message: message.to_string(),
        author: author.to_string(),
        date: base_date(),
        url: None,
    }
}

pub fn pull(number: u64, title: &str, author: &str, labels: &[&str]) -> PullRequestInfo {
    PullRequestInfo {
        number,
        title: title.to_string(),
        author: author.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        merged_at: Some(base_date()),
        url: None,
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn get_tags(&self, _owner: &str, _repo: &str, max_tags: usize) -> ProviderResult<Vec<TagInfo>> {
        self.record("get_tags");
        Ok(self.tags.iter().take(max_tags).cloned().collect())
    }

    async fn fill_tag_date(&self, _owner: &str, _repo: &str, tag: TagInfo) -> ProviderResult<TagInfo> {
        self.record(&format!("fill_tag_date {}", tag.name));
        Ok(tag)
    }

    async fn get_tag_annotation(
        &self,
        _owner: &str,
        _repo: &str,
        tag: &str,
    ) -> ProviderResult<Option<String>> {
        self.record("get_tag_annotation");
        Ok(self.annotations.get(tag).cloned())
    }

    async fn get_latest_release(&self, _owner: &str, _repo: &str) -> ProviderResult<Option<String>> {
        self.record("get_latest_release");
        if self.latest_release_fails {
            return Err(ProviderError::Api {
                status: 500,
                message: "releases unavailable".to_string(),
            });
        }
        Ok(self.latest_release.clone())
    }

    async fn get_diff_remote(
        &self,
        _owner: &str,
        _repo: &str,
        _base: &str,
        _head: &str,
    ) -> ProviderResult<DiffInfo> {
        self.record("get_diff_remote");
        Ok(DiffInfo {
            commits: self.commits.clone(),
            ..DiffInfo::default()
        })
    }

    async fn get_for_commit_hash(
        &self,
        _owner: &str,
        _repo: &str,
        sha: &str,
        _max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        self.record("get_for_commit_hash");
        Ok(self.pulls_by_sha.get(sha).cloned().unwrap_or_default())
    }

    async fn get_between_dates(
        &self,
        _owner: &str,
        _repo: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        _max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        self.record("get_between_dates");
        Ok(vec![])
    }

    async fn get_open(
        &self,
        _owner: &str,
        _repo: &str,
        _max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        self.record("get_open");
        Ok(self.open.clone())
    }

    async fn get_commits(
        &self,
        _owner: &str,
        _repo: &str,
        _base: &str,
        _head: &str,
    ) -> ProviderResult<Vec<CommitInfo>> {
        self.record("get_commits");
        Ok(self.commits.clone())
    }
}
