use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use prtriage_core::{OutputFormat, TriageConfig};
use prtriage_engine::run::TriageRun;
use prtriage_github::GitHubClient;
use prtriage_nightly::NightlyClient;
use prtriage_slack::SlackClient;

const CONFIG_FILE: &str = ".prtriage.toml";

#[derive(Parser)]
#[command(
    name = "prtriage",
    version,
    about = "Pull request triage bot for GitHub and Slack",
    long_about = "Queries GitHub pull requests, distributes review requests fairly\n\
                   across maintainers, reports naming violations and posts the daily\n\
                   QA queue to Slack.\n\n\
                   Examples:\n  \
                     prtriage notify --dry-run       Print today's messages without sending\n  \
                     prtriage notify                 Post today's messages to Slack\n  \
                     prtriage report                 Show pull requests per workflow stage\n  \
                     prtriage init                   Create a default .prtriage.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .prtriage.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable messages and tables (default)\n  \
                         json      Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable verbose (debug) logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build today's notifications and post them to Slack
    #[command(long_about = "Build today's notifications and post them to Slack.\n\n\
        Runs every rule in order: greeting, nightly board, QA statistics and the\n\
        ready-to-test queue go to the QA channel; review requests, naming fixes\n\
        and the Monday merge reminder go to each maintainer privately.\n\
        A rule that fails is logged and skipped.")]
    Notify {
        /// Print the messages instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// GitHub token (default: GH_TOKEN or GITHUB_TOKEN env var)
        #[arg(long)]
        github_token: Option<String>,

        /// Slack bot token (default: SLACK_TOKEN env var)
        #[arg(long)]
        slack_token: Option<String>,

        /// QA channel id (default: [slack] qa_channel or SLACK_CHANNEL_QA env var)
        #[arg(long)]
        qa_channel: Option<String>,

        /// Report date, YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show pull requests per workflow stage
    #[command(long_about = "Show pull requests per workflow stage.\n\n\
        Sections: merged since yesterday, waiting for merge, waiting for QA,\n\
        PM, UX and wording. Core repository rows include the linked issue.")]
    Report {
        /// GitHub token (default: GH_TOKEN or GITHUB_TOKEN env var)
        #[arg(long)]
        github_token: Option<String>,

        /// Report date, YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Create a default .prtriage.toml configuration file
    #[command(long_about = "Create a default .prtriage.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .prtriage.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# prtriage configuration

[github]
# organization = "PrestaShop"
# core_repository = "PrestaShop"
# specs_repository = "prestashop-specs"
# develop_branch = "develop"
# version_file = "app/AppKernel.php"

[slack]
# qa_channel = "C0123456789"
# api_base_url = "https://slack.com/api"

[team]
# lead = "lead-login"
# quota = 5
# reviewers_per_pull_request = 2

# [[team.maintainers]]
# github = "login"
# slack = "U0123456789"

[naming]
# types = ["bug fix", "improvement", "refacto", "new feature"]

# [naming.categories]
# FO = "Front office"
# BO = "Back office"

[qa]
# branches = ["1.7.8.x", "8.0.x", "develop"]
# campaigns = ["functional", "autoupgrade"]
# milestone_group_size = 3

[nightly]
# api_url = "https://api-nightly.prestashop.com"
# report_url = "https://nightly.prestashop.com/report"
"#;

fn load_config(path: Option<&Path>) -> Result<TriageConfig> {
    let config = match path {
        Some(path) => TriageConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                TriageConfig::from_file(default_path)?
            } else {
                TriageConfig::default()
            }
        }
    };
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(
        organization = %config.github.organization,
        maintainers = config.team.maintainers.len(),
        "configuration loaded"
    );

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
        }
        Some(Command::Notify {
            dry_run,
            ref github_token,
            ref slack_token,
            ref qa_channel,
            date,
        }) => {
            let qa_channel = qa_channel
                .clone()
                .or_else(|| config.slack.qa_channel.clone())
                .or_else(|| std::env::var("SLACK_CHANNEL_QA").ok());
            let qa_channel = match (qa_channel, dry_run) {
                (Some(channel), _) => channel,
                (None, true) => "qa".to_string(),
                (None, false) => miette::bail!(miette::miette!(
                    help = "Pass --qa-channel, set SLACK_CHANNEL_QA, \
                            or add qa_channel under [slack] in .prtriage.toml",
                    "No QA channel configured"
                )),
            };
            if config.team.maintainers.is_empty() {
                tracing::warn!("no maintainers configured, private messages will be empty");
            }

            let github = GitHubClient::new(&config.github, github_token.as_deref())?;
            let nightly = NightlyClient::new(&config.nightly)?;
            let today = date.unwrap_or_else(|| Utc::now().date_naive());

            let slack = if dry_run {
                None
            } else {
                Some(SlackClient::new(&config.slack, slack_token.as_deref())?)
            };
            let run = TriageRun::new(
                config.clone(),
                qa_channel,
                Box::new(github),
                Box::new(nightly),
            );

            let result = match &slack {
                Some(slack) => run.run(today, slack).await,
                None => run.collect(today).await,
            };

            match cli.format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => print!("{result}"),
            }
        }
        Some(Command::Report {
            ref github_token,
            date,
        }) => {
            let github = GitHubClient::new(&config.github, github_token.as_deref())?;
            let today = date.unwrap_or_else(|| Utc::now().date_naive());
            let sections = prtriage_engine::report::collect(&config, &github, today).await;

            match cli.format {
                OutputFormat::Json => print_json(&sections)?,
                OutputFormat::Text => {
                    print!("{}", prtriage_engine::report::render_table(&sections))
                }
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "prtriage", &mut std::io::stdout());
        }
    }

    Ok(())
}
