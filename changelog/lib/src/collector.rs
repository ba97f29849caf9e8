//! Pull request collection for a resolved tag range.
//!
//! - **PR**: every merged pull request containing a commit of the range.
//!   Commits without a pull request are dropped.
//! - **COMMIT**: one synthetic entry per commit.
//! - **HYBRID**: one entry per commit, using the first pull request found for
//!   it and a synthetic entry otherwise.
//!
//! Entries keep the order of the provider's commit listing. Pull requests are
//! deduplicated by number (first occurrence wins); synthetic entries are
//! never deduplicated.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::Result;
use crate::providers::Provider;
use crate::types::{Mode, Platform, PullRequestInfo};

/// What to collect.
#[derive(Debug, Clone)]
pub struct CollectRequest<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub from_tag: &'a str,
    pub to_tag: &'a str,
    pub mode: Mode,
    /// Append currently open pull requests (PR and HYBRID on hosted platforms only).
    pub include_open: bool,
    pub platform: Platform,
    pub max_pull_requests: usize,
}

/// Ordered list that drops pull requests whose number was already seen.
#[derive(Debug, Default)]
struct OrderedEntries {
    seen: HashSet<u64>,
    entries: Vec<PullRequestInfo>,
}

impl OrderedEntries {
    fn push(&mut self, entry: PullRequestInfo) {
        if entry.is_synthetic() || self.seen.insert(entry.number) {
            self.entries.push(entry);
        }
    }

    fn into_vec(self) -> Vec<PullRequestInfo> {
        self.entries
    }
}

/// Collects the changelog entries for `request`.
///
/// The first provider error is returned as is.
pub async fn collect_pull_requests(
    provider: &dyn Provider,
    request: &CollectRequest<'_>,
) -> Result<Vec<PullRequestInfo>> {
    let CollectRequest {
        owner,
        repo,
        from_tag,
        to_tag,
        ..
    } = *request;
    let mut entries = OrderedEntries::default();

    match request.mode {
        Mode::Commit => {
            let commits = provider.get_commits(owner, repo, from_tag, to_tag).await?;
            debug!("{} commits between {} and {}", commits.len(), from_tag, to_tag);
            for commit in &commits {
                entries.push(PullRequestInfo::from_commit(commit));
            }
        }
        Mode::Pr | Mode::Hybrid => {
            let diff = provider.get_diff_remote(owner, repo, from_tag, to_tag).await?;
            debug!("{} commits between {} and {}", diff.commits.len(), from_tag, to_tag);

            for commit in &diff.commits {
                let prs = provider
                    .get_for_commit_hash(owner, repo, &commit.sha, request.max_pull_requests)
                    .await?;

                if request.mode == Mode::Pr {
                    prs.into_iter().for_each(|pr| entries.push(pr));
                } else if let Some(pr) = prs.into_iter().next() {
                    entries.push(pr);
                } else {
                    entries.push(PullRequestInfo::from_commit(commit));
                }
            }
        }
    }

    if request.include_open && request.mode != Mode::Commit && !request.platform.is_local() {
        let open = provider
            .get_open(owner, repo, request.max_pull_requests)
            .await?;
        debug!("{} open pull requests", open.len());
        open.into_iter().for_each(|pr| entries.push(pr));
    }

    let entries = entries.into_vec();
    info!("Collected {} entries in {} mode", entries.len(), request.mode);
    Ok(entries)
}

/// Unique authors in first-seen order, joined by `, `.
pub fn contributors(entries: &[PullRequestInfo]) -> String {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|e| e.author.as_str())
        .filter(|a| !a.is_empty() && seen.insert(*a))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Numbers of real pull requests in collection order, joined by `, `.
pub fn pull_request_numbers(entries: &[PullRequestInfo]) -> String {
    entries
        .iter()
        .filter(|e| !e.is_synthetic())
        .map(|e| e.number.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
