//! GitHub REST API provider.
//!
//! Talks to `api.github.com` or a GitHub Enterprise API root. The tag listing
//! carries no dates, so tags are ordered by version number and only the two
//! ends of a resolved range are dated, through their commits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    ApiCommit, ApiPullRequest, Provider, ProviderResult, check_status, sort_by_version,
};
use crate::types::{CommitInfo, DiffInfo, PullRequestInfo, TagInfo};

const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct GitHubTag {
    name: String,
    commit: GitHubObjectRef,
}

#[derive(Debug, Deserialize)]
struct GitHubObjectRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    object: GitHubRefObject,
}

#[derive(Debug, Deserialize)]
struct GitHubRefObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct GitHubAnnotatedTag {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubFile {
    #[serde(default)]
    additions: usize,
    #[serde(default)]
    deletions: usize,
    #[serde(default)]
    changes: usize,
}

#[derive(Debug, Deserialize)]
struct GitHubComparison {
    #[serde(default)]
    commits: Vec<ApiCommit>,
    #[serde(default)]
    files: Vec<GitHubFile>,
}

/// Provider backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubProvider {
    /// Creates a provider for the API root `base_url` (e.g. `https://api.github.com`).
    pub fn new(client: Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ProviderResult<T> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Like [`Self::fetch`] but maps 404 to `None`.
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

    async fn compare(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<DiffInfo> {
        let path = format!("/repos/{}/{}/compare/{}...{}", owner, repo, base, head);
        let mut diff = DiffInfo::default();

        let mut page = 1;
        loop {
            let request = self.get(&path).query(&[
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let comparison: GitHubComparison = self.fetch(request).await?;

            if page == 1 {
                diff.changed_files = comparison.files.len();
                for file in &comparison.files {
                    diff.additions += file.additions;
                    diff.deletions += file.deletions;
                    diff.changes += file.changes;
                }
            }

            let fetched = comparison.commits.len();
            diff.commits
                .extend(comparison.commits.into_iter().map(CommitInfo::from));
            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(
            "Compared {}...{}: {} commits, {} files",
            base,
            head,
            diff.commits.len(),
            diff.changed_files
        );
        Ok(diff)
    }

    async fn list_pulls(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        page: usize,
    ) -> ProviderResult<Vec<ApiPullRequest>> {
        let request = self
            .get(&format!("/repos/{}/{}/pulls", owner, repo))
            .query(&[
                ("state", state.to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
        self.fetch(request).await
    }
}

#[async_trait]
impl Provider for GitHubProvider {
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
                .query(&[
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ]);
            let batch: Vec<GitHubTag> = self.fetch(request).await?;
            let fetched = batch.len();
            // dated later by fill_tag_date, for the range ends only
            tags.extend(
                batch
                    .into_iter()
                    .map(|t| TagInfo::new(t.name, t.commit.sha, DateTime::<Utc>::default())),
            );
            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }

        sort_by_version(&mut tags);
        tags.truncate(max_tags);
        debug!("Fetched {} tags for {}/{}", tags.len(), owner, repo);
        Ok(tags)
    }

    async fn fill_tag_date(
        &self,
        owner: &str,
        repo: &str,
        tag: TagInfo,
    ) -> ProviderResult<TagInfo> {
        let request = self.get(&format!("/repos/{}/{}/commits/{}", owner, repo, tag.sha));
        let commit: ApiCommit = self.fetch(request).await?;
        Ok(TagInfo {
            date: commit.commit.author.date,
            ..tag
        })
    }

    async fn get_tag_annotation(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> ProviderResult<Option<String>> {
        let request = self.get(&format!("/repos/{}/{}/git/ref/tags/{}", owner, repo, tag));
        let Some(reference) = self.fetch_optional::<GitHubRef>(request).await? else {
            return Ok(None);
        };
        // lightweight tags point straight at a commit
        if reference.object.kind != "tag" {
            return Ok(None);
        }

        let request = self.get(&format!(
            "/repos/{}/{}/git/tags/{}",
            owner, repo, reference.object.sha
        ));
        let annotated: Option<GitHubAnnotatedTag> = self.fetch_optional(request).await?;
        Ok(annotated
            .and_then(|t| t.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()))
    }

    async fn get_latest_release(&self, owner: &str, repo: &str) -> ProviderResult<Option<String>> {
        let request = self.get(&format!("/repos/{}/{}/releases/latest", owner, repo));
        let release: Option<GitHubRelease> = self.fetch_optional(request).await?;
        Ok(release.map(|r| r.tag_name))
    }

    async fn get_diff_remote(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<DiffInfo> {
        self.compare(owner, repo, base, head).await
    }

    async fn get_for_commit_hash(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        let request = self
            .get(&format!("/repos/{}/{}/commits/{}/pulls", owner, repo, sha))
            .query(&[("per_page", max_pull_requests.clamp(1, PER_PAGE).to_string())]);
        let pulls: Vec<ApiPullRequest> = self.fetch(request).await?;

        Ok(pulls
            .into_iter()
            .filter(|pr| pr.merged_at.is_some())
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
        let mut result = Vec::new();
        let mut page = 1;
        while result.len() < max_pull_requests {
            let batch = self.list_pulls(owner, repo, "closed", page).await?;
            let fetched = batch.len();
            result.extend(
                batch
                    .into_iter()
                    .filter(|pr| pr.merged_at.is_some_and(|at| at >= from && at <= to))
                    .map(PullRequestInfo::from),
            );
            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }
        result.truncate(max_pull_requests);
        Ok(result)
    }

    async fn get_open(
        &self,
        owner: &str,
        repo: &str,
        max_pull_requests: usize,
    ) -> ProviderResult<Vec<PullRequestInfo>> {
        let mut result = Vec::new();
        let mut page = 1;
        while result.len() < max_pull_requests {
            let batch = self.list_pulls(owner, repo, "open", page).await?;
            let fetched = batch.len();
            result.extend(batch.into_iter().map(PullRequestInfo::from));
            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }
        result.truncate(max_pull_requests);
        Ok(result)
    }

    async fn get_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> ProviderResult<Vec<CommitInfo>> {
        Ok(self.compare(owner, repo, base, head).await?.commits)
    }
}
