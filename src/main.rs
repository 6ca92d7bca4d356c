use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rulesync::apply::print_summary;
use rulesync::config::parse_repositories;
use rulesync::{console, ApplyEngine, Config, GitHubClient, RuleSet};

#[derive(Parser)]
#[command(name = "rulesync")]
#[command(about = "Apply branch-protection rulesets to an organization's repositories")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Organization that owns the repositories (overrides ORGANIZATION)
    #[arg(long)]
    org: Option<String>,

    /// JSON array of repository names (overrides REPOSITORIES)
    #[arg(long)]
    repositories: Option<String>,

    /// Branch naming ruleset file (built-in ruleset if omitted)
    #[arg(long)]
    naming_rule: Option<String>,

    /// Branch deletion prevention ruleset file (built-in ruleset if omitted)
    #[arg(long)]
    prevent_delete_rule: Option<String>,

    /// GitHub API base URL (overrides GITHUB_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        console::failure(&format!("Error in main function: {:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    console::set_color(config.logging.color && !cli.no_color);
    init_logging(cli.verbose, &config.logging.level);
    info!("Starting rulesync v{}", env!("CARGO_PKG_VERSION"));

    let organization = config.require_organization()?;
    let repositories = config.require_repositories()?;

    let rules = RuleSet {
        naming: config
            .naming_rule()
            .context("Failed to load branch naming ruleset")?,
        prevent_delete: config
            .prevent_delete_rule()
            .context("Failed to load prevent-delete ruleset")?,
    };

    let client = GitHubClient::new(config.github.api_url.as_deref())?;
    let engine = ApplyEngine::new(client, organization, rules);

    let summary = engine.run(repositories).await;
    print_summary(&summary);

    Ok(())
}

/// Initialize logging; RUST_LOG wins, then --verbose, then the configured level
fn init_logging(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(level)
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Build configuration: defaults, then the config file, then environment, then flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    config.apply_env()?;

    if let Some(org) = &cli.org {
        config.organization = Some(org.clone());
    }
    if let Some(raw) = &cli.repositories {
        config.repositories = Some(parse_repositories(raw).context("Invalid --repositories value")?);
    }
    if let Some(path) = &cli.naming_rule {
        config.rules.naming = Some(path.clone());
    }
    if let Some(path) = &cli.prevent_delete_rule {
        config.rules.prevent_delete = Some(path.clone());
    }
    if let Some(url) = &cli.api_url {
        config.github.api_url = Some(url.clone());
    }

    config.expand_paths()?;
    Ok(config)
}
