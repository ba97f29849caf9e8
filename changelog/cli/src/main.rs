//! Changelog CLI - release notes from tags and pull requests

use changelog_lib::environment::RunEnvironment;
use changelog_lib::inputs::RawInputs;
use changelog_lib::pipeline::RunOutputs;
use clap::Parser;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Every input can also be set through its GitHub Actions variable
/// (`INPUT_<NAME>`), so the binary runs unchanged as an action step.
#[derive(Parser, Debug)]
#[command(name = "changelog")]
#[command(version)]
#[command(about = "Generate release changelogs from tags and pull requests", long_about = None)]
struct Cli {
    /// Hosting platform: github, gitea, local or git [default: auto-detect]
    #[arg(long, env = "INPUT_PLATFORM")]
    platform: Option<String>,

    /// API token [default: GITHUB_TOKEN / GITEA_TOKEN]
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Repository as owner/repo [default: GITHUB_REPOSITORY or origin remote]
    #[arg(long, env = "INPUT_REPO")]
    repo: Option<String>,

    /// Older end of the range: a tag, -N, or @latest-release [default: previous tag]
    #[arg(long, env = "INPUT_FROMTAG", allow_hyphen_values = true)]
    from_tag: Option<String>,

    /// Newer end of the range: a tag or @current [default: latest tag]
    #[arg(long, env = "INPUT_TOTAG")]
    to_tag: Option<String>,

    /// PR, COMMIT or HYBRID [default: PR]
    #[arg(long, env = "INPUT_MODE")]
    mode: Option<String>,

    /// Inline configuration JSON
    #[arg(long, env = "INPUT_CONFIGURATIONJSON")]
    configuration_json: Option<String>,

    /// Configuration file, relative to the repository
    #[arg(long, env = "INPUT_CONFIGURATION")]
    configuration: Option<String>,

    /// Skip semver pre-release tags
    #[arg(long, env = "INPUT_IGNOREPRERELEASES")]
    ignore_pre_releases: bool,

    /// Fetch the annotation of toTag for #{{TAG_ANNOTATION}}
    #[arg(long, env = "INPUT_FETCHTAGANNOTATIONS")]
    fetch_tag_annotations: bool,

    /// Text placed before the changelog
    #[arg(long, env = "INPUT_PREFIXMESSAGE")]
    prefix_message: Option<String>,

    /// Text placed after the changelog
    #[arg(long, env = "INPUT_POSTFIXMESSAGE")]
    postfix_message: Option<String>,

    /// Also list currently open pull requests (PR and HYBRID modes)
    #[arg(long, env = "INPUT_INCLUDEOPEN")]
    include_open: bool,

    /// Exit non-zero when generation fails
    #[arg(long, env = "INPUT_FAILONERROR")]
    fail_on_error: bool,

    /// Maximum number of tags to fetch [default: 1000]
    #[arg(long, env = "INPUT_MAXTAGSTOFETCH")]
    max_tags_to_fetch: Option<String>,

    /// Maximum pull requests per lookup [default: 200]
    #[arg(long, env = "INPUT_MAXPULLREQUESTS")]
    max_pull_requests: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, env = "INPUT_SKIPCERTIFICATECHECK")]
    skip_certificate_check: bool,

    /// Verbose logging (same as -v)
    #[arg(long, env = "INPUT_VERBOSE")]
    verbose: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print all outputs as one JSON object instead of the changelog text
    #[arg(long)]
    json: bool,

    /// Repository location [default: workspace or current directory]
    #[arg(long, value_name = "DIR")]
    repository_path: Option<PathBuf>,
}

impl Cli {
    fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            platform: self.platform.clone(),
            token: self.token.clone(),
            repo: self.repo.clone(),
            from_tag: self.from_tag.clone(),
            to_tag: self.to_tag.clone(),
            mode: self.mode.clone(),
            configuration_json: self.configuration_json.clone(),
            configuration: self.configuration.clone(),
            ignore_pre_releases: self.ignore_pre_releases,
            fetch_tag_annotations: self.fetch_tag_annotations,
            prefix_message: self.prefix_message.clone(),
            postfix_message: self.postfix_message.clone(),
            include_open: self.include_open,
            max_tags_to_fetch: self.max_tags_to_fetch.clone(),
            max_pull_requests: self.max_pull_requests.clone(),
            skip_certificate_check: self.skip_certificate_check,
        }
    }

    /// `-v` count, raised to 1 by `--verbose` or `ACTIONS_STEP_DEBUG`.
    fn verbosity(&self, env: &RunEnvironment) -> u8 {
        if self.verbose || env.step_debug {
            self.log_verbosity.max(1)
        } else {
            self.log_verbosity
        }
    }
}

/// Initialize tracing subscriber; logs go to stderr so stdout stays clean.
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn,changelog_lib=info".to_string(),
            1 => "info,changelog_lib=debug".to_string(),
            _ => "debug,changelog_lib=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(verbose >= 2)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

/// Delimiter for the multi-line `name<<delimiter` output format.
fn output_delimiter(outputs: &RunOutputs) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut delimiter = format!("ghadelimiter_{}_{}", std::process::id(), nanos);
    while outputs.pairs().iter().any(|(_, v)| v.contains(&delimiter)) {
        delimiter.push('_');
    }
    delimiter
}

/// Appends every output to the `GITHUB_OUTPUT` file.
fn write_github_output(path: &Path, outputs: &RunOutputs) -> io::Result<()> {
    let delimiter = output_delimiter(outputs);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (name, value) in outputs.pairs() {
        writeln!(file, "{}<<{}", name, delimiter)?;
        writeln!(file, "{}", value)?;
        writeln!(file, "{}", delimiter)?;
    }
    Ok(())
}

fn env_snapshot() -> RunEnvironment {
    RunEnvironment::from_vars(
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let env = env_snapshot();
    init_tracing(cli.verbosity(&env), cli.json_logs);

    let raw = cli.raw_inputs();
    let outputs = changelog_lib::run(&raw, &env, cli.repository_path.as_deref()).await;

    if let Some(path) = std::env::var_os("GITHUB_OUTPUT")
        && let Err(e) = write_github_output(Path::new(&path), &outputs)
    {
        tracing::error!("Failed to write GITHUB_OUTPUT: {}", e);
    }

    if cli.json {
        match serde_json::to_string_pretty(&outputs) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", outputs.changelog);
    }

    if outputs.failed && cli.fail_on_error {
        if let Some(message) = &outputs.error {
            eprintln!("Error: {}", message);
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
