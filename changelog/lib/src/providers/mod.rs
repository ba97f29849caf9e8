//! Hosting-platform providers.
//!
//! The resolver, collector and pipeline only see the [`Provider`] trait.
//! One implementation exists per platform:
//!
//! - [`github`]: GitHub REST API
//! - [`gitea`]: Gitea API v1
//! - [`local`]: a local repository read through `git2` (no pull requests)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::warn;

use crate::error::ProviderError;
use crate::types::{CommitInfo, DiffInfo, Platform, PullRequestInfo, TagInfo};

pub mod gitea;
pub mod github;
pub mod local;

pub use gitea::GiteaProvider;
pub use github::GitHubProvider;
pub use local::LocalGitProvider;

/// Convenience Result type for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Data access for one hosting platform.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Tags ordered newest-first, at most `max_tags` of them.
    async fn get_tags(&self, owner: &str, repo: &str, max_tags: usize)
    -> ProviderResult<Vec<TagInfo>>;

    /// Returns `tag` with its real date, for listings that could not date
    /// every tag up front. Called only for the two ends of a resolved range.
    async fn fill_tag_date(
        &self,
        _owner: &str,
        _repo: &str,
        tag: TagInfo,
    ) -> ProviderResult<TagInfo> {
        Ok(tag)
    }

    /// Annotation message of an annotated tag; `None` for lightweight tags.
    async fn get_tag_annotation(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> ProviderResult<Option<String>>;

    /// Tag name of the most recent published release, if the platform has one.
    async fn get_latest_release(&self, owner: &str, repo: &str) -> ProviderResult<Option<String>>;

    /// Commits and change counts between two refs.
    async fn get_diff_remote(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<DiffInfo>;

    /// Merged pull requests that contain `sha`.
    async fn get_for_commit_hash(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>>;

    /// Pull requests merged within `[from, to]`.
    async fn get_between_dates(
        &self,
        owner: &str,
        repo: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>>;

    /// Currently open pull requests.
    async fn get_open(
        &self,
        owner: &str,
        repo: &str,
        max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>>;

    /// Raw commits between two refs.
    async fn get_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<Vec<CommitInfo>>;
}

/// Everything needed to build a provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub platform: Platform,
    pub token: Option<String>,
    /// API root; ignored for local platforms.
    pub base_url: String,
    pub repository_path: PathBuf,
    pub skip_certificate_check: bool,
}

/// Builds the provider for `settings.platform`.
pub fn create_provider(settings: &ProviderSettings) -> ProviderResult<Box<dyn Provider>> {
    match settings.platform {
        Platform::GitHub => {
            let client = http_client(settings.skip_certificate_check)?;
            Ok(Box::new(GitHubProvider::new(
                client,
                &settings.base_url,
                settings.token.clone(),
            )))
        }
        Platform::Gitea => {
            let client = http_client(settings.skip_certificate_check)?;
            Ok(Box::new(GiteaProvider::new(
                client,
                &settings.base_url,
                settings.token.clone(),
            )))
        }
        Platform::Local | Platform::Git => Ok(Box::new(LocalGitProvider::new(
            settings.repository_path.clone(),
        ))),
    }
}

pub(crate) const USER_AGENT: &str = "changelog-lib";

fn http_client(skip_certificate_check: bool) -> ProviderResult<Client> {
    if skip_certificate_check {
        warn!(
            "TLS certificate verification is disabled. Only use this with trusted endpoints."
        );
    }
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(skip_certificate_check)
        .build()?)
}

/// Turns a non-success response into [`ProviderError::Api`].
pub(crate) async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = || status.canonical_reason().unwrap_or("Unknown error").to_string();
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body),
        Ok(_) => reason(),
        Err(e) => {
            warn!("Could not read error body: {}", e);
            reason()
        }
    };
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// GitHub and Gitea share the shape of pull request and commit payloads.

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub number: u64,
    pub title: String,
    pub user: Option<ApiUser>,
    #[serde(default)]
    pub labels: Vec<ApiLabel>,
    pub merged_at: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
}

impl From<ApiPullRequest> for PullRequestInfo {
    fn from(pr: ApiPullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            author: pr.user.map(|u| u.login).unwrap_or_default(),
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            merged_at: pr.merged_at,
            url: pr.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCommitSignature {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCommitDetail {
    pub message: String,
    pub author: ApiCommitSignature,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCommit {
    pub sha: String,
    pub commit: ApiCommitDetail,
    pub author: Option<ApiUser>,
    pub html_url: Option<String>,
}

impl From<ApiCommit> for CommitInfo {
    fn from(c: ApiCommit) -> Self {
        Self {
            sha: c.sha,
            message: c.commit.message,
            author: c.author.map(|a| a.login).unwrap_or(c.commit.author.name),
            date: c.commit.author.date,
            url: c.html_url,
        }
    }
}

/// Stable newest-first ordering; same-date tags keep descending name order.
pub(crate) fn sort_newest_first(tags: &mut [TagInfo]) {
    tags.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.name.cmp(&a.name)));
}

fn tag_version(name: &str) -> Option<semver::Version> {
    semver::Version::parse(name.strip_prefix('v').unwrap_or(name)).ok()
}

/// Highest version first. Names that are not semver follow, in their
/// original order.
pub(crate) fn sort_by_version(tags: &mut [TagInfo]) {
    tags.sort_by(|a, b| match (tag_version(&a.name), tag_version(&b.name)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
