//! Changelog configuration: templates, categories and ignore rules.
//!
//! User configuration arrives as JSON, either inline or from a file. Every
//! field is optional and missing fields fall back to the default
//! individually; an override of `categories` does not reset `template`.
//!
//! ## Examples
//!
//! ```
//! use changelog_lib::config::Configuration;
//!
//! let config = Configuration::from_json(r#"{ "empty_template": "nothing" }"#).unwrap();
//! assert_eq!(config.empty_template, "nothing");
//! assert_eq!(config.template, "#{{CHANGELOG}}");
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info, warn};

/// A named bucket of labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Section heading rendered above the entries
    pub title: String,
    /// An entry carrying any of these labels belongs here
    pub labels: Vec<String>,
}

impl Category {
    pub fn new(title: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            title: title.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// True when any of `labels` belongs to this category.
    pub fn matches(&self, labels: &[String]) -> bool {
        labels.iter().any(|l| self.labels.contains(l))
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub template: String,
    pub pr_template: String,
    pub commit_template: String,
    pub empty_template: String,
    pub categories: Vec<Category>,
    pub ignore_labels: Vec<String>,
    pub trim_values: bool,
    #[serde(rename = "defaultCategory")]
    pub default_category: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            template: "#{{CHANGELOG}}".to_string(),
            pr_template: "- #{{TITLE}}\n   - PR: ##{{NUMBER}}".to_string(),
            commit_template: "- #{{TITLE}}".to_string(),
            empty_template: "- no changes".to_string(),
            categories: vec![
                Category::new("## 🚀 Features", &["feature"]),
                Category::new("## 🐛 Bug Fixes", &["bug", "fix"]),
                Category::new("## 📝 Documentation", &["documentation", "docs"]),
                Category::new("## 🔧 Maintenance", &["maintenance", "chore"]),
            ],
            ignore_labels: vec![],
            trim_values: true,
            default_category: "## Other Changes".to_string(),
        }
    }
}

/// User-supplied configuration before defaults are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialConfiguration {
    pub template: Option<String>,
    pub pr_template: Option<String>,
    pub commit_template: Option<String>,
    pub empty_template: Option<String>,
    pub categories: Option<Vec<Category>>,
    pub ignore_labels: Option<Vec<String>>,
    pub trim_values: Option<bool>,
    #[serde(rename = "defaultCategory")]
    pub default_category: Option<String>,
}

impl PartialConfiguration {
    /// Fills every missing field from [`Configuration::default`].
    pub fn merge_with_defaults(self) -> Configuration {
        let defaults = Configuration::default();
        Configuration {
            template: self.template.unwrap_or(defaults.template),
            pr_template: self.pr_template.unwrap_or(defaults.pr_template),
            commit_template: self.commit_template.unwrap_or(defaults.commit_template),
            empty_template: self.empty_template.unwrap_or(defaults.empty_template),
            categories: self.categories.unwrap_or(defaults.categories),
            ignore_labels: self.ignore_labels.unwrap_or(defaults.ignore_labels),
            trim_values: self.trim_values.unwrap_or(defaults.trim_values),
            default_category: self.default_category.unwrap_or(defaults.default_category),
        }
    }
}

impl Configuration {
    /// Parses a JSON document and merges it onto the defaults.
    ///
    /// `null` values count as missing.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let partial: PartialConfiguration = serde_json::from_str(json)?;
        Ok(partial.merge_with_defaults())
    }

    /// Same configuration with a different `empty_template`.
    pub fn with_empty_template(&self, empty_template: impl Into<String>) -> Self {
        Self {
            empty_template: empty_template.into(),
            ..self.clone()
        }
    }
}

/// Resolves the configuration from inline JSON, then a file, then defaults.
///
/// A source that is missing or fails to parse is logged and skipped; this
/// never fails.
///
/// ## Arguments
///
/// * `repository_path` - Base directory for a relative `config_file`
/// * `config_json` - Inline JSON document
/// * `config_file` - Path to a JSON file
pub fn resolve_configuration(
    repository_path: &Path,
    config_json: Option<&str>,
    config_file: Option<&str>,
) -> Configuration {
    if let Some(json) = config_json {
        match Configuration::from_json(json) {
            Ok(config) => {
                info!("Using configuration from configurationJson input");
                return config;
            }
            Err(e) => error!("Failed to parse configuration JSON: {}", e),
        }
    }

    if let Some(file) = config_file
        && let Some(config) = load_configuration_file(&repository_path.join(file))
    {
        info!("Using configuration from configuration file");
        return config;
    }

    info!("No configuration provided, using defaults");
    Configuration::default()
}

fn load_configuration_file(path: &Path) -> Option<Configuration> {
    if !path.exists() {
        warn!("Configuration file not found: {}", path.display());
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read configuration file {}: {}", path.display(), e);
            return None;
        }
    };

    match Configuration::from_json(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            error!("Failed to load configuration from file: {}", e);
            None
        }
    }
}
