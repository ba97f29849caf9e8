//! Gitea API v1 provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::debug;

use super::{
    ApiCommit, ApiCommitDetail, ApiPullRequest, ApiUser, Provider, ProviderResult, check_status,
    sort_newest_first,
};
use crate::types::{CommitInfo, DiffInfo, PullRequestInfo, TagInfo};

const PAGE_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct GiteaTagCommit {
    sha: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GiteaTag {
    name: String,
    /// SHA of the tag object; equals the commit SHA for lightweight tags.
    id: String,
    message: Option<String>,
    commit: GiteaTagCommit,
}

#[derive(Debug, Deserialize)]
struct GiteaRelease {
    tag_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct GiteaStats {
    #[serde(default)]
    additions: usize,
    #[serde(default)]
    deletions: usize,
}

#[derive(Debug, Deserialize)]
struct GiteaFile {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct GiteaCommit {
    sha: String,
    commit: ApiCommitDetail,
    author: Option<ApiUser>,
    html_url: Option<String>,
    stats: Option<GiteaStats>,
    #[serde(default)]
    files: Vec<GiteaFile>,
}

#[derive(Debug, Deserialize)]
struct GiteaComparison {
    #[serde(default)]
    commits: Vec<GiteaCommit>,
}

/// Provider backed by the Gitea API.
#[derive(Debug, Clone)]
pub struct GiteaProvider {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GiteaProvider {
    /// Creates a provider for the server at `server_url` (e.g. `https://gitea.com`).
    ///
    /// The `/api/v1` suffix is added when missing.
    pub fn new(client: Client, server_url: &str, token: Option<String>) -> Self {
        let trimmed = server_url.trim_end_matches('/');
        let api_url = if trimmed.ends_with("/api/v1") {
            trimmed.to_string()
        } else {
            format!("{}/api/v1", trimmed)
        };
        Self {
            client,
            api_url,
            token,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .get(format!("{}{}", self.api_url, path))
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token));
        }
        request
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ProviderResult<T> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ProviderResult<Option<T>> {
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn list_pulls(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        max_pull_requests: usize,
        keep: impl Fn(&ApiPullRequest) -> bool,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        let mut result = Vec::new();
        let mut page = 1;
        while result.len() < max_pull_requests {
            let request = self
                .get(&format!("/repos/{}/{}/pulls", owner, repo))
                .query(&[
                    ("state", state.to_string()),
                    ("sort", "recentupdate".to_string()),
                    ("page", page.to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                ]);
            let batch: Vec<ApiPullRequest> = self.fetch(request).await?;
            let fetched = batch.len();
            result.extend(batch.into_iter().filter(&keep).map(PullRequestInfo::from));
            if fetched < PAGE_LIMIT {
                break;
            }
            page += 1;
        }
        result.truncate(max_pull_requests);
        Ok(result)
    }
}

#[async_trait]
impl Provider for GiteaProvider {
    async fn get_tags(
        &self,
        owner: &str,
        repo: &str,
        max_tags: usize,
    ) -> ProviderResult<Vec<TagInfo>> {
        let mut tags = Vec::new();
        let mut page = 1;
        while tags.len() < max_tags {
            let request = self
                .get(&format!("/repos/{}/{}/tags", owner, repo))
                .query(&[("page", page.to_string()), ("limit", PAGE_LIMIT.to_string())]);
            let batch: Vec<GiteaTag> = self.fetch(request).await?;
            let fetched = batch.len();
            tags.extend(
                batch
                    .into_iter()
                    .map(|t| TagInfo::new(t.name, t.commit.sha, t.commit.created)),
            );
            if fetched < PAGE_LIMIT {
                break;
            }
            page += 1;
        }
        sort_newest_first(&mut tags);
        tags.truncate(max_tags);
        debug!("Fetched {} tags for {}/{}", tags.len(), owner, repo);
        Ok(tags)
    }

    async fn get_tag_annotation(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> ProviderResult<Option<String>> {
        let request = self.get(&format!("/repos/{}/{}/tags/{}", owner, repo, tag));
        let Some(tag) = self.fetch_optional::<GiteaTag>(request).await? else {
            return Ok(None);
        };
        if tag.id == tag.commit.sha {
            return Ok(None);
        }
        Ok(tag
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()))
    }

    async fn get_latest_release(&self, owner: &str, repo: &str) -> ProviderResult<Option<String>> {
        let request = self.get(&format!("/repos/{}/{}/releases/latest", owner, repo));
        let release: Option<GiteaRelease> = self.fetch_optional(request).await?;
        Ok(release.map(|r| r.tag_name))
    }

    async fn get_diff_remote(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<DiffInfo> {
        let request = self.get(&format!(
            "/repos/{}/{}/compare/{}...{}",
            owner, repo, base, head
        ));
        let comparison: GiteaComparison = self.fetch(request).await?;

        let mut diff = DiffInfo::default();
        let mut files = HashSet::new();
        for commit in comparison.commits {
            let stats = commit.stats.unwrap_or_default();
            diff.additions += stats.additions;
            diff.deletions += stats.deletions;
            files.extend(commit.files.into_iter().map(|f| f.filename));

            diff.commits.push(CommitInfo::from(ApiCommit {
                sha: commit.sha,
                commit: commit.commit,
                author: commit.author,
                html_url: commit.html_url,
            }));
        }
        diff.changed_files = files.len();
        diff.changes = diff.additions + diff.deletions;

        debug!(
            "Compared {}...{}: {} commits",
            base,
            head,
            diff.commits.len()
        );
        Ok(diff)
    }

    async fn get_for_commit_hash(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        let request = self.get(&format!("/repos/{}/{}/commits/{}/pull", owner, repo, sha));
        let pull: Option<ApiPullRequest> = self.fetch_optional(request).await?;
        Ok(pull
            .filter(|pr| pr.merged_at.is_some())
            .into_iter()
            .take(max_pull_requests)
            .map(PullRequestInfo::from)
            .collect())
    }

    async fn get_between_dates(
        &self,
        owner: &str,
        repo: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        self.list_pulls(owner, repo, "closed", max_pull_requests, |pr| {
            pr.merged_at.is_some_and(|at| at >= from && at <= to)
        })
        .await
    }

    async fn get_open(
        &self,
        owner: &str,
        repo: &str,
        max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        self.list_pulls(owner, repo, "open", max_pull_requests, |_| true)
            .await
    }

    async fn get_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<Vec<CommitInfo>> {
        Ok(self.get_diff_remote(owner, repo, base, head).await?.commits)
    }
}
