//! Tag range resolution.
//!
//! Turns the user's `fromTag` / `toTag` tokens into a concrete pair of tags
//! taken from a newest-first tag list.
//!
//! ## toTag tokens
//!
//! - absent, blank or `@current`: the latest tag (index 0)
//! - a name: that tag, or the latest tag with a warning when it does not exist
//!
//! ## fromTag tokens
//!
//! - absent or blank: the tag right after toTag (its predecessor)
//! - `-N` with `N > 0`: the tag `N` positions older than toTag
//! - `@latest-release`: the provider's latest release tag, when it exists in
//!   the list and differs from toTag; the predecessor otherwise
//! - anything else, including `-0` and `-abc`: an exact name, which must exist
//!
//! ## Examples
//!
//! ```
//! use changelog_lib::tags::resolve_range;
//! use changelog_lib::types::TagInfo;
//! use chrono::Utc;
//!
//! let tags: Vec<TagInfo> = ["v3.0.0", "v2.0.0", "v1.0.0"]
//!     .iter()
//!     .map(|n| TagInfo::new(*n, "sha", Utc::now()))
//!     .collect();
//!
//! let range = resolve_range(&tags, Some("-2"), None, || None).unwrap();
//! assert_eq!(range.to.name, "v3.0.0");
//! assert_eq!(range.from.name, "v1.0.0");
//! ```

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::error::{Result, TagResolutionError};
use crate::providers::Provider;
use crate::types::TagInfo;

/// toTag sentinel for "the latest tag".
pub const CURRENT_TOKEN: &str = "@current";
/// fromTag sentinel for "the latest published release".
pub const LATEST_RELEASE_TOKEN: &str = "@latest-release";

static OFFSET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-([0-9]+)$").expect("Invalid regex"));

/// The resolved release range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRange {
    /// Older end of the range.
    pub from: TagInfo,
    /// Newer end of the range.
    pub to: TagInfo,
}

/// Parsed toTag token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToTagToken {
    Latest,
    Name(String),
}

impl ToTagToken {
    pub fn parse(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            None | Some("") | Some(CURRENT_TOKEN) => Self::Latest,
            Some(name) => Self::Name(name.to_string()),
        }
    }
}

/// Parsed fromTag token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromTagToken {
    /// Predecessor of toTag.
    Auto,
    LatestRelease,
    /// `-N`; `raw` keeps the digits as written for error messages.
    Offset { steps: usize, raw: String },
    Name(String),
}

impl FromTagToken {
    /// Classifies a fromTag token.
    ///
    /// `-0` and non-numeric suffixes are names, not offsets. Offsets too large
    /// for `usize` saturate and end up out of range.
    pub fn parse(token: Option<&str>) -> Self {
        let token = match token.map(str::trim) {
            None | Some("") => return Self::Auto,
            Some(t) => t,
        };
        if token == LATEST_RELEASE_TOKEN {
            return Self::LatestRelease;
        }
        if let Some(caps) = OFFSET_PATTERN.captures(token) {
            let raw = &caps[1];
            if raw.bytes().any(|b| b != b'0') {
                let steps = raw.parse::<usize>().unwrap_or(usize::MAX);
                return Self::Offset {
                    steps,
                    raw: raw.to_string(),
                };
            }
        }
        Self::Name(token.to_string())
    }
}

fn position(tags: &[TagInfo], name: &str) -> Option<usize> {
    tags.iter().position(|t| t.name == name)
}

/// Resolves the toTag index. Only fails on an empty tag list.
pub fn resolve_to_tag(
    tags: &[TagInfo],
    token: &ToTagToken,
) -> std::result::Result<usize, TagResolutionError> {
    if tags.is_empty() {
        return Err(TagResolutionError::NoTags);
    }

    match token {
        ToTagToken::Latest => Ok(0),
        ToTagToken::Name(name) => match position(tags, name) {
            Some(index) => Ok(index),
            None => {
                warn!(
                    "toTag '{}' not found, falling back to latest tag '{}'",
                    name, tags[0].name
                );
                Ok(0)
            }
        },
    }
}

/// Resolves the fromTag index relative to the toTag index `to_index`.
///
/// `latest_release` is only consulted for [`FromTagToken::LatestRelease`].
pub fn resolve_from_tag(
    tags: &[TagInfo],
    to_index: usize,
    token: &FromTagToken,
    latest_release: Option<&str>,
) -> std::result::Result<usize, TagResolutionError> {
    match token {
        FromTagToken::Name(name) => {
            position(tags, name).ok_or_else(|| TagResolutionError::NotFound(name.clone()))
        }
        FromTagToken::Offset { steps, raw } => to_index
            .checked_add(*steps)
            .filter(|index| *index < tags.len())
            .ok_or_else(|| TagResolutionError::OffsetOutOfRange(raw.clone())),
        FromTagToken::LatestRelease => {
            let to_name = tags[to_index].name.as_str();
            match latest_release {
                Some(release) if release == to_name => {
                    info!(
                        "Latest release '{}' is the toTag itself, using previous tag",
                        release
                    );
                }
                Some(release) => match position(tags, release) {
                    Some(index) => return Ok(index),
                    None => info!(
                        "Latest release '{}' not found among tags, using previous tag",
                        release
                    ),
                },
                None => info!("No latest release available, using previous tag"),
            }
            predecessor(tags, to_index)
        }
        FromTagToken::Auto => predecessor(tags, to_index),
    }
}

fn predecessor(tags: &[TagInfo], to_index: usize) -> std::result::Result<usize, TagResolutionError> {
    let index = to_index + 1;
    if index < tags.len() {
        Ok(index)
    } else {
        Err(TagResolutionError::Undetermined)
    }
}

/// Resolves both ends of the range from a newest-first tag list.
///
/// `latest_release` is called at most once, and only for the
/// `@latest-release` token.
pub fn resolve_range(
    tags: &[TagInfo],
    from_token: Option<&str>,
    to_token: Option<&str>,
    latest_release: impl FnOnce() -> Option<String>,
) -> std::result::Result<TagRange, TagResolutionError> {
    let to_index = resolve_to_tag(tags, &ToTagToken::parse(to_token))?;

    let from = FromTagToken::parse(from_token);
    let release = match from {
        FromTagToken::LatestRelease => latest_release(),
        _ => None,
    };
    let from_index = resolve_from_tag(tags, to_index, &from, release.as_deref())?;

    Ok(TagRange {
        from: tags[from_index].clone(),
        to: tags[to_index].clone(),
    })
}

/// Options for [`resolve_tags`].
#[derive(Debug, Clone)]
pub struct TagQuery {
    /// Cap passed to the provider's tag listing.
    pub max_tags: usize,
    /// Drop semver pre-release tags before resolving.
    pub ignore_pre_releases: bool,
}

impl Default for TagQuery {
    fn default() -> Self {
        Self {
            max_tags: 1000,
            ignore_pre_releases: false,
        }
    }
}

/// True for names like `v1.2.0-rc.1` or `2.0.0-beta`.
pub fn is_pre_release(name: &str) -> bool {
    let version = name.strip_prefix('v').unwrap_or(name);
    semver::Version::parse(version).is_ok_and(|v| !v.pre.is_empty())
}

/// Removes pre-release tags, keeping `keep` (the explicit toTag) even if it is one.
pub fn filter_pre_releases(tags: Vec<TagInfo>, keep: Option<&str>) -> Vec<TagInfo> {
    tags.into_iter()
        .filter(|t| Some(t.name.as_str()) == keep || !is_pre_release(&t.name))
        .collect()
}

/// Fetches the tag list from `provider` and resolves the range.
///
/// The latest release is only requested for the `@latest-release` token; a
/// provider failure there degrades to the predecessor like a missing release.
/// Both ends of the range come back dated through [`Provider::fill_tag_date`].
pub async fn resolve_tags(
    provider: &dyn Provider,
    owner: &str,
    repo: &str,
    from_token: Option<&str>,
    to_token: Option<&str>,
    query: &TagQuery,
) -> Result<TagRange> {
    let mut tags = provider.get_tags(owner, repo, query.max_tags).await?;
    debug!("Provider returned {} tags", tags.len());

    if query.ignore_pre_releases {
        let keep = match ToTagToken::parse(to_token) {
            ToTagToken::Name(name) => Some(name),
            ToTagToken::Latest => None,
        };
        tags = filter_pre_releases(tags, keep.as_deref());
        debug!("{} tags left after dropping pre-releases", tags.len());
    }

    let release = if FromTagToken::parse(from_token) == FromTagToken::LatestRelease {
        match provider.get_latest_release(owner, repo).await {
            Ok(release) => release,
            Err(e) => {
                warn!("Could not fetch latest release: {}", e);
                None
            }
        }
    } else {
        None
    };

    let range = resolve_range(&tags, from_token, to_token, || release)?;
    Ok(TagRange {
        to: provider.fill_tag_date(owner, repo, range.to).await?,
        from: provider.fill_tag_date(owner, repo, range.from).await?,
    })
}
