//! End-to-end changelog run.
//!
//! [`run`] validates the inputs, detects the platform and repository, builds
//! a provider, and drives the tag resolver, collector and renderer in
//! sequence. Any failure turns into a fallback changelog instead of an
//! error; the caller decides the exit code from [`RunOutputs::failed`].

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, error, info};

use crate::collector::{CollectRequest, collect_pull_requests, contributors, pull_request_numbers};
use crate::config::{Configuration, resolve_configuration};
use crate::environment::{
    RunEnvironment, api_base_url, detect_owner_repo, detect_platform, detect_token,
};
use crate::error::{InputError, Result};
use crate::inputs::{ParsedInputs, RawInputs, normalize_optional};
use crate::providers::{Provider, ProviderSettings, create_provider};
use crate::render::generate_changelog;
use crate::tags::{TagQuery, resolve_tags};
use crate::types::{Mode, Platform};

static NO_TAGS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)no tags found in repository").expect("Invalid regex"));

/// Everything a run produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutputs {
    pub changelog: String,
    pub owner: String,
    pub repo: String,
    pub from_tag: String,
    pub to_tag: String,
    /// Unique authors, first-seen order, joined by `, `.
    pub contributors: String,
    /// Numbers of real pull requests, joined by `, `.
    pub pull_requests: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_annotation: Option<String>,
    pub failed: bool,
    /// Failure message, not an output itself.
    #[serde(skip)]
    pub error: Option<String>,
}

impl RunOutputs {
    /// `(name, value)` pairs in the order they are published.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("changelog", self.changelog.clone()),
            ("owner", self.owner.clone()),
            ("repo", self.repo.clone()),
            ("fromTag", self.from_tag.clone()),
            ("toTag", self.to_tag.clone()),
            ("contributors", self.contributors.clone()),
            ("pullRequests", self.pull_requests.clone()),
        ];
        if let Some(annotation) = &self.tag_annotation {
            pairs.push(("tagAnnotation", annotation.clone()));
        }
        pairs.push(("failed", self.failed.to_string()));
        pairs
    }
}

/// Where and how to run, after detection.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub inputs: ParsedInputs,
    pub platform: Platform,
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
    pub base_url: String,
    pub repository_path: PathBuf,
}

impl RunContext {
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            platform: self.platform,
            token: self.token.clone(),
            base_url: self.base_url.clone(),
            repository_path: self.repository_path.clone(),
            skip_certificate_check: self.inputs.skip_certificate_check,
        }
    }
}

/// Rejects PR and HYBRID mode on platforms without pull requests.
pub fn ensure_mode_supported(platform: Platform, mode: Mode) -> std::result::Result<(), InputError> {
    if platform.is_local() && mode != Mode::Commit {
        return Err(InputError::ModeNotSupported(platform.to_string()));
    }
    Ok(())
}

/// Detects platform, token and repository, then applies the local-mode guard.
pub fn prepare(
    inputs: ParsedInputs,
    env: &RunEnvironment,
    repository_path: PathBuf,
) -> Result<RunContext> {
    let platform = detect_platform(inputs.platform, env, &repository_path);
    let base_url = api_base_url(platform, env);
    let token = detect_token(platform, inputs.token.as_deref(), env);
    let (owner, repo) =
        detect_owner_repo(inputs.repo.as_deref(), platform, env, &repository_path)?;

    info!("Processing {}/{} on {}", owner, repo, platform);
    debug!("Platform: {}, Base URL: {}, Owner: {}, Repo: {}", platform, base_url, owner, repo);

    ensure_mode_supported(platform, inputs.mode)?;

    Ok(RunContext {
        inputs,
        platform,
        owner,
        repo,
        token,
        base_url,
        repository_path,
    })
}

/// Resolves tags, collects entries and renders them with `config`.
pub async fn build_changelog(
    provider: &dyn Provider,
    context: &RunContext,
    config: &Configuration,
) -> Result<RunOutputs> {
    let inputs = &context.inputs;
    let (owner, repo) = (context.owner.as_str(), context.repo.as_str());

    let range = resolve_tags(
        provider,
        owner,
        repo,
        inputs.from_tag.as_deref(),
        inputs.to_tag.as_deref(),
        &TagQuery {
            max_tags: inputs.max_tags_to_fetch,
            ignore_pre_releases: inputs.ignore_pre_releases,
        },
    )
    .await?;
    info!("Comparing {}...{}", range.from.name, range.to.name);

    let tag_annotation = if inputs.fetch_tag_annotations {
        let annotation = provider
            .get_tag_annotation(owner, repo, &range.to.name)
            .await?;
        if annotation.is_some() {
            info!("Retrieved tag annotation for {}", range.to.name);
        }
        annotation
    } else {
        None
    };

    let entries = collect_pull_requests(
        provider,
        &CollectRequest {
            owner,
            repo,
            from_tag: &range.from.name,
            to_tag: &range.to.name,
            mode: inputs.mode,
            include_open: inputs.include_open,
            platform: context.platform,
            max_pull_requests: inputs.max_pull_requests,
        },
    )
    .await?;
    info!("Found {} items to include in changelog", entries.len());

    let changelog = generate_changelog(
        &entries,
        config,
        tag_annotation.as_deref(),
        inputs.prefix_message.as_deref(),
        inputs.postfix_message.as_deref(),
    );

    Ok(RunOutputs {
        changelog,
        owner: context.owner.clone(),
        repo: context.repo.clone(),
        from_tag: range.from.name,
        to_tag: range.to.name,
        contributors: contributors(&entries),
        pull_requests: pull_request_numbers(&entries),
        tag_annotation,
        failed: false,
        error: None,
    })
}

/// Text that replaces `empty_template` when a run fails.
pub fn fallback_message(message: &str, empty_template: &str) -> String {
    if NO_TAGS_PATTERN.is_match(message) {
        format!("⚠️ {}\n\n{}", message, empty_template)
    } else {
        format!("⚠️ Changelog generation failed: {}", message)
    }
}

/// Outputs for a failed run: a rendered fallback changelog and empty values.
pub fn fallback_outputs(
    message: &str,
    config: &Configuration,
    prefix: Option<&str>,
    postfix: Option<&str>,
) -> RunOutputs {
    let config = config.with_empty_template(fallback_message(message, &config.empty_template));
    RunOutputs {
        changelog: generate_changelog(&[], &config, None, prefix, postfix),
        failed: true,
        error: Some(message.to_string()),
        ..RunOutputs::default()
    }
}

/// Runs the whole pipeline. Never fails; check [`RunOutputs::failed`].
///
/// `repository_path` overrides the workspace/current-directory default.
pub async fn run(
    raw: &RawInputs,
    env: &RunEnvironment,
    repository_path: Option<&Path>,
) -> RunOutputs {
    let repository_path = env.repository_path(repository_path);
    let mut config: Option<Configuration> = None;

    let result: Result<RunOutputs> = async {
        let inputs = raw.parse()?;
        let context = prepare(inputs, env, repository_path.clone())?;
        let provider = create_provider(&context.provider_settings())?;

        let resolved = resolve_configuration(
            &context.repository_path,
            context.inputs.configuration_json.as_deref(),
            context.inputs.configuration.as_deref(),
        );
        let resolved = config.insert(resolved);

        build_changelog(provider.as_ref(), &context, resolved).await
    }
    .await;

    match result {
        Ok(outputs) => {
            info!("Changelog generated successfully");
            outputs
        }
        Err(e) => {
            let message = e.to_string();
            error!("{}", message);
            let config = config.unwrap_or_else(|| {
                resolve_configuration(
                    &repository_path,
                    normalize_optional(raw.configuration_json.as_deref()).as_deref(),
                    normalize_optional(raw.configuration.as_deref()).as_deref(),
                )
            });
            fallback_outputs(
                &message,
                &config,
                normalize_optional(raw.prefix_message.as_deref()).as_deref(),
                normalize_optional(raw.postfix_message.as_deref()).as_deref(),
            )
        }
    }
}
