//! Changelog rendering.
//!
//! Entries are partitioned into the configured categories, each entry is
//! rendered through `pr_template` or `commit_template`, and the sections are
//! substituted into the top-level `template`.
//!
//! Substitution is plain string replacement; substituted values are never
//! scanned for placeholders again.

use crate::config::Configuration;
use crate::types::PullRequestInfo;

pub const CHANGELOG_PLACEHOLDER: &str = "#{{CHANGELOG}}";
pub const TAG_ANNOTATION_PLACEHOLDER: &str = "#{{TAG_ANNOTATION}}";
pub const TITLE_PLACEHOLDER: &str = "#{{TITLE}}";
pub const NUMBER_PLACEHOLDER: &str = "#{{NUMBER}}";
pub const AUTHOR_PLACEHOLDER: &str = "#{{AUTHOR}}";
pub const LABELS_PLACEHOLDER: &str = "#{{LABELS}}";
pub const URL_PLACEHOLDER: &str = "#{{URL}}";

/// Where an entry ended up after categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Carries an ignore label.
    Ignored,
    /// Index into `config.categories`.
    Category(usize),
    Default,
}

/// Places one entry. Ignore labels win over categories; the first matching
/// category wins over later ones.
pub fn categorize(entry: &PullRequestInfo, config: &Configuration) -> Placement {
    if entry.labels.iter().any(|l| config.ignore_labels.contains(l)) {
        return Placement::Ignored;
    }
    config
        .categories
        .iter()
        .position(|c| c.matches(&entry.labels))
        .map_or(Placement::Default, Placement::Category)
}

/// Substitution for `#{{...}}`, in a single left-to-right pass so values that
/// contain placeholder text are left alone.
fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'outer: while !rest.is_empty() {
        for (placeholder, value) in values {
            if let Some(tail) = rest.strip_prefix(placeholder) {
                out.push_str(value);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

fn render_entry(entry: &PullRequestInfo, config: &Configuration) -> String {
    let clean = |s: &str| -> String {
        if config.trim_values {
            s.trim().to_string()
        } else {
            s.to_string()
        }
    };

    let title = clean(&entry.title);
    let author = clean(&entry.author);
    let number = entry.number.to_string();
    let labels = entry.labels.join(", ");
    let url = entry.url.clone().unwrap_or_default();

    let template = if entry.is_synthetic() {
        &config.commit_template
    } else {
        &config.pr_template
    };

    substitute(
        template,
        &[
            (TITLE_PLACEHOLDER, title.as_str()),
            (NUMBER_PLACEHOLDER, number.as_str()),
            (AUTHOR_PLACEHOLDER, author.as_str()),
            (LABELS_PLACEHOLDER, labels.as_str()),
            (URL_PLACEHOLDER, url.as_str()),
        ],
    )
}

/// Renders the category sections, or `None` when nothing survives filtering.
fn render_sections(entries: &[PullRequestInfo], config: &Configuration) -> Option<String> {
    let mut named: Vec<Vec<String>> = vec![Vec::new(); config.categories.len()];
    let mut default = Vec::new();

    for entry in entries {
        match categorize(entry, config) {
            Placement::Ignored => {}
            Placement::Category(i) => named[i].push(render_entry(entry, config)),
            Placement::Default => default.push(render_entry(entry, config)),
        }
    }

    let sections: Vec<String> = config
        .categories
        .iter()
        .map(|c| c.title.as_str())
        .zip(named)
        .chain(std::iter::once((config.default_category.as_str(), default)))
        .filter(|(_, lines)| !lines.is_empty())
        .map(|(title, lines)| format!("{}\n\n{}", title, lines.join("\n")))
        .collect();

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// Renders the changelog text.
///
/// ## Arguments
///
/// * `entries` - Collected entries in collection order
/// * `config` - Templates and categories
/// * `tag_annotation` - Replaces `#{{TAG_ANNOTATION}}`; empty when `None`
/// * `prefix` / `postfix` - Joined to the body with a newline when present
///
/// ## Examples
///
/// ```
/// use changelog_lib::config::Configuration;
/// use changelog_lib::render::generate_changelog;
///
/// let text = generate_changelog(&[], &Configuration::default(), None, Some("# v1.0.0"), None);
/// assert_eq!(text, "# v1.0.0\n- no changes");
/// ```
pub fn generate_changelog(
    entries: &[PullRequestInfo],
    config: &Configuration,
    tag_annotation: Option<&str>,
    prefix: Option<&str>,
    postfix: Option<&str>,
) -> String {
    let changelog =
        render_sections(entries, config).unwrap_or_else(|| config.empty_template.clone());

    let body = substitute(
        &config.template,
        &[
            (CHANGELOG_PLACEHOLDER, changelog.as_str()),
            (TAG_ANNOTATION_PLACEHOLDER, tag_annotation.unwrap_or("")),
        ],
    );

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if let Some(prefix) = prefix {
        parts.push(prefix);
    }
    parts.push(body.as_str());
    if let Some(postfix) = postfix {
        parts.push(postfix);
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Category;

    fn pr(number: u64, title: &str, labels: &[&str]) -> PullRequestInfo {
        PullRequestInfo {
            number,
            title: title.to_string(),
            author: "octocat".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            merged_at: None,
            url: Some(format!("https://example.invalid/pull/{}", number)),
        }
    }

    #[test]
    fn test_empty_entries_use_empty_template() {
        let text = generate_changelog(&[], &Configuration::default(), None, None, None);
        assert_eq!(text, "- no changes");
    }

    #[test]
    fn test_default_layout() {
        let entries = vec![
            pr(1, "Add login", &["feature"]),
            pr(2, "Fix crash", &["bug"]),
            pr(3, "Refactor", &[]),
        ];
        let text = generate_changelog(&entries, &Configuration::default(), None, None, None);
        assert_eq!(
            text,
            "## 🚀 Features\n\n- Add login\n   - PR: #1\n\n\
             ## 🐛 Bug Fixes\n\n- Fix crash\n   - PR: #2\n\n\
             ## Other Changes\n\n- Refactor\n   - PR: #3"
        );
    }

    #[test]
    fn test_ignore_label_drops_entry() {
        let config = Configuration {
            ignore_labels: vec!["skip-changelog".into()],
            ..Configuration::default()
        };
        let entries = vec![pr(1, "Hidden", &["feature", "skip-changelog"])];
        assert_eq!(categorize(&entries[0], &config), Placement::Ignored);
        assert_eq!(generate_changelog(&entries, &config, None, None, None), "- no changes");
    }

    #[test]
    fn test_first_matching_category_wins() {
        let config = Configuration::default();
        // "fix" belongs to Bug Fixes, "docs" to Documentation; Bug Fixes comes first
        let entry = pr(1, "Both", &["docs", "fix"]);
        assert_eq!(categorize(&entry, &config), Placement::Category(1));
        assert_eq!(categorize(&pr(2, "None", &["misc"]), &config), Placement::Default);
    }

    #[test]
    fn test_categorization_is_a_partition() {
        let config = Configuration {
            ignore_labels: vec!["ignore".into()],
            ..Configuration::default()
        };
        let entries = vec![
            pr(1, "a", &["feature"]),
            pr(2, "b", &["ignore"]),
            pr(3, "c", &["chore"]),
            pr(4, "d", &[]),
            pr(5, "e", &["feature", "bug"]),
        ];
        let rendered = generate_changelog(&entries, &config, None, None, None);
        for kept in ["- a\n", "- c\n", "- d\n", "- e\n"] {
            assert_eq!(rendered.matches(kept).count(), 1, "{kept}");
        }
        assert!(!rendered.contains("- b\n"));
    }

    #[test]
    fn test_synthetic_entries_use_commit_template() {
        let config = Configuration {
            commit_template: "* #{{TITLE}} by #{{AUTHOR}}".into(),
            ..Configuration::default()
        };
        let entry = pr(0, "Tweak build", &[]);
        let text = generate_changelog(&[entry], &config, None, None, None);
        assert_eq!(text, "## Other Changes\n\n* Tweak build by octocat");
    }

    #[test]
    fn test_all_entry_placeholders() {
        let config = Configuration {
            categories: vec![],
            default_category: "## All".into(),
            pr_template: "#{{NUMBER}}|#{{TITLE}}|#{{AUTHOR}}|#{{LABELS}}|#{{URL}}".into(),
            ..Configuration::default()
        };
        let text = generate_changelog(&[pr(9, "T", &["x", "y"])], &config, None, None, None);
        assert_eq!(text, "## All\n\n9|T|octocat|x, y|https://example.invalid/pull/9");
    }

    #[test]
    fn test_trim_values() {
        let mut entry = pr(0, "  padded  ", &[]);
        entry.author = " bob ".into();
        let mut config = Configuration {
            commit_template: "[#{{TITLE}}|#{{AUTHOR}}]".into(),
            ..Configuration::default()
        };
        assert_eq!(render_entry(&entry, &config), "[padded|bob]");

        config.trim_values = false;
        assert_eq!(render_entry(&entry, &config), "[  padded  | bob ]");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let entry = pr(0, "literal #{{AUTHOR}}", &[]);
        let config = Configuration::default();
        assert_eq!(render_entry(&entry, &config), "- literal #{{AUTHOR}}");
    }

    #[test]
    fn test_tag_annotation_and_wrapping() {
        let config = Configuration {
            template: "#{{TAG_ANNOTATION}}\n\n#{{CHANGELOG}}".into(),
            ..Configuration::default()
        };
        let text = generate_changelog(
            &[],
            &config,
            Some("Big release"),
            Some("PREFIX"),
            Some("POSTFIX"),
        );
        assert_eq!(text, "PREFIX\nBig release\n\n- no changes\nPOSTFIX");

        let text = generate_changelog(&[], &config, None, None, None);
        assert_eq!(text, "\n\n- no changes");
    }

    #[test]
    fn test_empty_categories_are_omitted() {
        let config = Configuration {
            categories: vec![Category::new("## A", &["a"]), Category::new("## B", &["b"])],
            ..Configuration::default()
        };
        let text = generate_changelog(&[pr(1, "only b", &["b"])], &config, None, None, None);
        assert_eq!(text, "## B\n\n- only b\n   - PR: #1");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let entries = vec![pr(1, "a", &["feature"]), pr(0, "b", &[]), pr(2, "c", &["docs"])];
        let config = Configuration::default();
        let first = generate_changelog(&entries, &config, Some("note"), Some("p"), None);
        let second = generate_changelog(&entries, &config, Some("note"), Some("p"), None);
        assert_eq!(first, second);
    }
}
