//! Raw run inputs and their validation.
//!
//! [`RawInputs`] holds values exactly as the front-end received them;
//! [`RawInputs::parse`] validates them before any I/O happens. Flags that
//! only steer the front-end itself (exit code, log level) stay there.

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::types::{Mode, Platform};

pub const DEFAULT_MAX_TAGS: usize = 1000;
pub const DEFAULT_MAX_PULL_REQUESTS: usize = 200;

/// Inputs as strings and flags, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInputs {
    pub platform: Option<String>,
    pub token: Option<String>,
    /// `owner/repo`
    pub repo: Option<String>,
    pub from_tag: Option<String>,
    pub to_tag: Option<String>,
    pub mode: Option<String>,
    pub configuration_json: Option<String>,
    pub configuration: Option<String>,
    pub ignore_pre_releases: bool,
    pub fetch_tag_annotations: bool,
    pub prefix_message: Option<String>,
    pub postfix_message: Option<String>,
    pub include_open: bool,
    pub max_tags_to_fetch: Option<String>,
    pub max_pull_requests: Option<String>,
    pub skip_certificate_check: bool,
}

/// Validated inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInputs {
    /// `None` means auto-detect.
    pub platform: Option<Platform>,
    pub token: Option<String>,
    pub repo: Option<String>,
    pub from_tag: Option<String>,
    pub to_tag: Option<String>,
    pub mode: Mode,
    pub configuration_json: Option<String>,
    pub configuration: Option<String>,
    pub ignore_pre_releases: bool,
    pub fetch_tag_annotations: bool,
    pub prefix_message: Option<String>,
    pub postfix_message: Option<String>,
    pub include_open: bool,
    pub max_tags_to_fetch: usize,
    pub max_pull_requests: usize,
    pub skip_certificate_check: bool,
}

impl Default for ParsedInputs {
    fn default() -> Self {
        Self {
            platform: None,
            token: None,
            repo: None,
            from_tag: None,
            to_tag: None,
            mode: Mode::default(),
            configuration_json: None,
            configuration: None,
            ignore_pre_releases: false,
            fetch_tag_annotations: false,
            prefix_message: None,
            postfix_message: None,
            include_open: false,
            max_tags_to_fetch: DEFAULT_MAX_TAGS,
            max_pull_requests: DEFAULT_MAX_PULL_REQUESTS,
            skip_certificate_check: false,
        }
    }
}

/// Trims; blank becomes `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse_count(
    name: &'static str,
    value: Option<&str>,
    default: usize,
) -> Result<usize, InputError> {
    match normalize_optional(value) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| InputError::Number { name, value: v }),
    }
}

impl RawInputs {
    /// Validates every input.
    ///
    /// ## Errors
    ///
    /// Returns the first malformed mode, platform or number.
    pub fn parse(&self) -> Result<ParsedInputs, InputError> {
        let mode = normalize_optional(self.mode.as_deref())
            .map(|m| m.parse::<Mode>())
            .transpose()?
            .unwrap_or_default();
        let platform = normalize_optional(self.platform.as_deref())
            .map(|p| p.parse::<Platform>())
            .transpose()?;

        Ok(ParsedInputs {
            platform,
            token: normalize_optional(self.token.as_deref()),
            repo: normalize_optional(self.repo.as_deref()),
            from_tag: normalize_optional(self.from_tag.as_deref()),
            to_tag: normalize_optional(self.to_tag.as_deref()),
            mode,
            configuration_json: normalize_optional(self.configuration_json.as_deref()),
            configuration: normalize_optional(self.configuration.as_deref()),
            ignore_pre_releases: self.ignore_pre_releases,
            fetch_tag_annotations: self.fetch_tag_annotations,
            prefix_message: normalize_optional(self.prefix_message.as_deref()),
            postfix_message: normalize_optional(self.postfix_message.as_deref()),
            include_open: self.include_open,
            max_tags_to_fetch: parse_count(
                "maxTagsToFetch",
                self.max_tags_to_fetch.as_deref(),
                DEFAULT_MAX_TAGS,
            )?,
            max_pull_requests: parse_count(
                "maxPullRequests",
                self.max_pull_requests.as_deref(),
                DEFAULT_MAX_PULL_REQUESTS,
            )?,
            skip_certificate_check: self.skip_certificate_check,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_parse_to_defaults() {
        assert_eq!(RawInputs::default().parse().unwrap(), ParsedInputs::default());
    }

    #[test]
    fn test_blank_strings_become_none() {
        let raw = RawInputs {
            from_tag: Some("   ".into()),
            to_tag: Some(" v1.0.0 ".into()),
            mode: Some("".into()),
            ..Default::default()
        };
        let parsed = raw.parse().unwrap();
        assert_eq!(parsed.from_tag, None);
        assert_eq!(parsed.to_tag.as_deref(), Some("v1.0.0"));
        assert_eq!(parsed.mode, Mode::Pr);
    }

    #[test]
    fn test_mode_and_platform() {
        let raw = RawInputs {
            mode: Some("hybrid".into()),
            platform: Some("Gitea".into()),
            ..Default::default()
        };
        let parsed = raw.parse().unwrap();
        assert_eq!(parsed.mode, Mode::Hybrid);
        assert_eq!(parsed.platform, Some(Platform::Gitea));

        let raw = RawInputs {
            platform: Some("bitbucket".into()),
            ..Default::default()
        };
        assert_eq!(
            raw.parse().unwrap_err().to_string(),
            "Invalid platform: bitbucket. Must be github, gitea, local, or git."
        );
    }

    #[test]
    fn test_numeric_inputs() {
        let raw = RawInputs {
            max_tags_to_fetch: Some("50".into()),
            max_pull_requests: Some(" 10 ".into()),
            ..Default::default()
        };
        let parsed = raw.parse().unwrap();
        assert_eq!(parsed.max_tags_to_fetch, 50);
        assert_eq!(parsed.max_pull_requests, 10);

        let raw = RawInputs {
            max_pull_requests: Some("many".into()),
            ..Default::default()
        };
        assert_eq!(
            raw.parse().unwrap_err(),
            InputError::Number {
                name: "maxPullRequests",
                value: "many".into()
            }
        );
    }
}
