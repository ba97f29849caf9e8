//! Core value types shared by the resolver, collector and renderer.
//!
//! Everything here is built once per run from provider responses and never
//! mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InputError;

/// A named, dated pointer to a commit.
///
/// Tag lists handed around by providers are ordered newest-first; index 0
/// is the latest tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag name (e.g., "v1.2.3")
    pub name: String,
    /// SHA of the tagged commit
    pub sha: String,
    /// Date of the tagged commit
    pub date: DateTime<Utc>,
}

impl TagInfo {
    pub fn new(name: impl Into<String>, sha: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            sha: sha.into(),
            date,
        }
    }
}

/// A pull request, or a commit dressed up as one.
///
/// `number == 0` marks a synthetic entry built from a raw commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub labels: Vec<String>,
    /// Merge timestamp for PRs, commit timestamp for synthetic entries.
    pub merged_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl PullRequestInfo {
    /// Builds a synthetic entry from a raw commit.
    ///
    /// The title is the first line of the commit message.
    ///
    /// ## Examples
    ///
    /// ```
    /// use changelog_lib::types::{CommitInfo, PullRequestInfo};
    /// use chrono::Utc;
    ///
    /// let commit = CommitInfo {
    ///     sha: "abc123".into(),
    ///     message: "Fix the parser\n\nLong explanation".into(),
    ///     author: "octocat".into(),
    ///     date: Utc::now(),
    ///     url: None,
    /// };
    /// let entry = PullRequestInfo::from_commit(&commit);
    /// assert_eq!(entry.number, 0);
    /// assert_eq!(entry.title, "Fix the parser");
    /// assert!(entry.is_synthetic());
    /// ```
    pub fn from_commit(commit: &CommitInfo) -> Self {
        Self {
            number: 0,
            title: commit.summary().to_string(),
            author: commit.author.clone(),
            labels: vec![],
            merged_at: Some(commit.date),
            url: commit.url.clone(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.number == 0
    }
}

/// A raw VCS commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full commit SHA.
    pub sha: String,
    /// Full commit message.
    pub message: String,
    /// Platform login when known, otherwise the author name.
    pub author: String,
    /// Commit timestamp.
    pub date: DateTime<Utc>,
    pub url: Option<String>,
}

impl CommitInfo {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim_end()
    }
}

/// Range diff between two refs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffInfo {
    pub changed_files: usize,
    pub additions: usize,
    pub deletions: usize,
    pub changes: usize,
    pub commits: Vec<CommitInfo>,
}

/// How the change set is assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Pull requests reachable from the range's commits.
    #[default]
    Pr,
    /// Raw commit log.
    Commit,
    /// Commit log, PR-enriched where a PR exists.
    Hybrid,
}

impl FromStr for Mode {
    type Err = InputError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PR" => Ok(Self::Pr),
            "COMMIT" => Ok(Self::Commit),
            "HYBRID" => Ok(Self::Hybrid),
            _ => Err(InputError::Mode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pr => write!(f, "PR"),
            Self::Commit => write!(f, "COMMIT"),
            Self::Hybrid => write!(f, "HYBRID"),
        }
    }
}

/// Hosting platform the repository lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    GitHub,
    Gitea,
    /// Local repository, no hosting API.
    Local,
    /// Alias of [`Platform::Local`] kept distinct for reporting.
    Git,
}

impl Platform {
    /// True for platforms without a hosting API (no pull requests).
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local | Self::Git)
    }
}

impl FromStr for Platform {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitea" => Ok(Self::Gitea),
            "local" => Ok(Self::Local),
            "git" => Ok(Self::Git),
            _ => Err(InputError::Platform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GitHub => "github",
            Self::Gitea => "gitea",
            Self::Local => "local",
            Self::Git => "git",
        };
        f.write_str(name)
    }
}
