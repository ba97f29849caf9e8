//! Release changelog generation from tags and pull requests.
//!
//! A run resolves a tag range, collects the pull requests (or commits) that
//! landed in it, and renders them through configurable templates grouped by
//! label categories.
//!
//! - [`tags`]: turns `fromTag` / `toTag` tokens into a concrete range
//! - [`collector`]: gathers entries for the range in PR, COMMIT or HYBRID mode
//! - [`render`]: categorizes entries and renders the changelog text
//! - [`providers`]: GitHub, Gitea and local git data access
//! - [`pipeline`]: the full run with detection and failure fallback
//!
//! ## Examples
//!
//! ```
//! use changelog_lib::config::Configuration;
//! use changelog_lib::render::generate_changelog;
//! use changelog_lib::types::PullRequestInfo;
//!
//! let entries = vec![PullRequestInfo {
//!     number: 7,
//!     title: "Add dark mode".into(),
//!     author: "octocat".into(),
//!     labels: vec!["feature".into()],
//!     merged_at: None,
//!     url: None,
//! }];
//!
//! let text = generate_changelog(&entries, &Configuration::default(), None, None, None);
//! assert_eq!(text, "## 🚀 Features\n\n- Add dark mode\n   - PR: #7");
//! ```

pub mod collector;
pub mod config;
pub mod environment;
pub mod error;
pub mod inputs;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod tags;
pub mod types;

pub use config::{Category, Configuration};
pub use error::{ChangelogError, InputError, ProviderError, Result, TagResolutionError};
pub use pipeline::{RunOutputs, run};
pub use providers::Provider;
pub use types::{CommitInfo, DiffInfo, Mode, Platform, PullRequestInfo, TagInfo};
