//! Run environment snapshot and platform/repository detection.
//!
//! Nothing in the library reads process environment variables. The front-end
//! builds a [`RunEnvironment`] once (usually from `std::env::vars()`) and the
//! detection helpers below work on that value.

use git2::Repository;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::InputError;
use crate::types::Platform;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITEA_URL: &str = "https://gitea.com";

static REMOTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:/]([^/:]+)/([^/:]+)$").expect("Invalid regex"));

/// The ambient variables a run depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunEnvironment {
    pub github_token: Option<String>,
    pub gitea_token: Option<String>,
    /// `owner/repo` as set by GitHub or Gitea Actions.
    pub github_repository: Option<String>,
    pub github_actions: bool,
    pub gitea_actions: bool,
    pub github_api_url: Option<String>,
    pub github_server_url: Option<String>,
    pub gitea_server_url: Option<String>,
    pub github_workspace: Option<String>,
    pub gitea_workspace: Option<String>,
    /// `ACTIONS_STEP_DEBUG` is set to a truthy value.
    pub step_debug: bool,
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1")
}

impl RunEnvironment {
    /// Builds a snapshot from `(name, value)` pairs. Blank values count as unset.
    ///
    /// ## Examples
    ///
    /// ```
    /// use changelog_lib::environment::RunEnvironment;
    ///
    /// let env = RunEnvironment::from_vars([
    ///     ("GITHUB_REPOSITORY".to_string(), "octo/hello".to_string()),
    ///     ("GITEA_ACTIONS".to_string(), "true".to_string()),
    /// ]);
    /// assert_eq!(env.github_repository.as_deref(), Some("octo/hello"));
    /// assert!(env.gitea_actions);
    /// ```
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env = Self::default();
        for (name, value) in vars {
            if value.trim().is_empty() {
                continue;
            }
            match name.as_str() {
                "GITHUB_TOKEN" => env.github_token = Some(value),
                "GITEA_TOKEN" => env.gitea_token = Some(value),
                "GITHUB_REPOSITORY" => env.github_repository = Some(value),
                "GITHUB_ACTIONS" => env.github_actions = is_truthy(&value),
                "GITEA_ACTIONS" => env.gitea_actions = is_truthy(&value),
                "GITHUB_API_URL" => env.github_api_url = Some(value),
                "GITHUB_SERVER_URL" => env.github_server_url = Some(value),
                "GITEA_SERVER_URL" => env.gitea_server_url = Some(value),
                "GITHUB_WORKSPACE" => env.github_workspace = Some(value),
                "GITEA_WORKSPACE" => env.gitea_workspace = Some(value),
                "ACTIONS_STEP_DEBUG" => env.step_debug = is_truthy(&value),
                _ => {}
            }
        }
        env
    }

    /// Repository location: the explicit path, else the Actions workspace,
    /// else the current directory (`.`).
    pub fn repository_path(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.github_workspace.as_ref().map(PathBuf::from))
            .or_else(|| self.gitea_workspace.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn has_tokens(&self) -> bool {
        self.github_token.is_some() || self.gitea_token.is_some()
    }
}

fn is_local_git_repo(path: &Path) -> bool {
    path.join(".git").exists() || (path.exists() && path.to_string_lossy().ends_with(".git"))
}

/// Picks the platform.
///
/// An explicit choice always wins. Otherwise a relative repository path with
/// a `.git` entry and no tokens in the environment selects local `git`;
/// `GITEA_ACTIONS` selects Gitea; everything else is GitHub.
pub fn detect_platform(
    explicit: Option<Platform>,
    env: &RunEnvironment,
    repository_path: &Path,
) -> Platform {
    if let Some(platform) = explicit {
        return platform;
    }

    let is_relative = repository_path.as_os_str().is_empty() || repository_path.is_relative();
    if !env.has_tokens() && is_relative && is_local_git_repo(repository_path) {
        info!("Detected local git repository (no tokens available, relative repository path)");
        return Platform::Git;
    }

    if env.gitea_actions {
        info!("Detected Gitea platform from environment");
        return Platform::Gitea;
    }
    if env.github_actions {
        info!("Detected GitHub platform from environment");
    } else {
        info!("No platform detected from environment, defaulting to GitHub");
    }
    Platform::GitHub
}

/// API root for `platform`; empty for local platforms.
pub fn api_base_url(platform: Platform, env: &RunEnvironment) -> String {
    match platform {
        Platform::Gitea => env
            .gitea_server_url
            .clone()
            .unwrap_or_else(|| DEFAULT_GITEA_URL.to_string()),
        Platform::GitHub => env
            .github_api_url
            .clone()
            .or_else(|| env.github_server_url.clone())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
        Platform::Local | Platform::Git => String::new(),
    }
}

/// Token for `platform`: the explicit one, else the platform's variable.
///
/// Gitea runners expose their token as `GITHUB_TOKEN` too, so it is the
/// second choice there. Local platforms never use a token.
pub fn detect_token(
    platform: Platform,
    explicit: Option<&str>,
    env: &RunEnvironment,
) -> Option<String> {
    if platform.is_local() {
        return None;
    }
    if let Some(token) = explicit {
        return Some(token.to_string());
    }
    match platform {
        Platform::Gitea => env.gitea_token.clone().or_else(|| env.github_token.clone()),
        _ => env.github_token.clone(),
    }
}

/// Extracts `(owner, repo)` from https, ssh and scp-like remote URLs.
///
/// ## Examples
///
/// ```
/// use changelog_lib::environment::parse_remote_url;
///
/// assert_eq!(
///     parse_remote_url("git@github.com:octo/hello.git"),
///     Some(("octo".to_string(), "hello".to_string()))
/// );
/// ```
pub fn parse_remote_url(url: &str) -> Option<(String, String)> {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    let captures = REMOTE_PATTERN.captures(url)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

fn split_owner_repo(value: &str) -> Option<(String, String)> {
    let (owner, repo) = value.trim().split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

fn origin_url(repository_path: &Path) -> Option<String> {
    let repo = Repository::discover(repository_path).ok()?;
    let remote = repo.find_remote("origin").ok()?;
    remote.url().map(String::from)
}

fn directory_name(repository_path: &Path) -> Option<String> {
    let path = repository_path
        .canonicalize()
        .unwrap_or_else(|_| repository_path.to_path_buf());
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Works out the repository owner and name.
///
/// Tried in order: the explicit `owner/repo` input, `GITHUB_REPOSITORY`, the
/// `origin` remote, and for local platforms `local/<directory name>`.
///
/// ## Errors
///
/// Returns [`InputError::Repository`] for a malformed explicit value or when
/// nothing matches.
pub fn detect_owner_repo(
    explicit: Option<&str>,
    platform: Platform,
    env: &RunEnvironment,
    repository_path: &Path,
) -> Result<(String, String), InputError> {
    if let Some(value) = explicit {
        return split_owner_repo(value).ok_or_else(|| {
            InputError::Repository(format!("expected 'owner/repo', got '{}'", value))
        });
    }

    if let Some(found) = env.github_repository.as_deref().and_then(split_owner_repo) {
        debug!("Repository taken from GITHUB_REPOSITORY");
        return Ok(found);
    }

    if let Some(url) = origin_url(repository_path)
        && let Some(found) = parse_remote_url(&url)
    {
        debug!("Repository taken from origin remote {}", url);
        return Ok(found);
    }

    if platform.is_local()
        && let Some(name) = directory_name(repository_path)
    {
        return Ok(("local".to_string(), name));
    }

    Err(InputError::Repository(
        "set the repo input or GITHUB_REPOSITORY".to_string(),
    ))
}
