use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use serde::Serialize;
use std::env;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::config::RuleConfig;
use crate::ruleset::{ExistingRuleset, RulesetApi};

/// Page size requested from the rulesets listing endpoint
const RULESETS_PER_PAGE: u8 = 100;

/// Upper bound on listing pages fetched for one repository
const MAX_RULESET_PAGES: u32 = 50;

/// GitHub client wrapper with authentication management
pub struct GitHubClient {
    client: Octocrab,
}

/// GitHub authentication strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Use environment variable token
    EnvironmentToken,
    /// Use GitHub CLI authentication
    GitHubCLI,
}

#[derive(Serialize)]
struct ListRulesetsParams {
    includes_parents: bool,
    per_page: u8,
    page: u32,
}

impl GitHubClient {
    /// Create a new GitHub client, taking the token from GITHUB_TOKEN or the GitHub CLI
    pub fn new(api_url: Option<&str>) -> Result<Self> {
        let (auth_strategy, token) = Self::detect_authentication()?;

        info!("Using authentication strategy: {:?}", auth_strategy);

        Self::with_token(token, api_url)
    }

    /// Create a client from an explicit token
    pub fn with_token(token: String, api_url: Option<&str>) -> Result<Self> {
        // Every request is attempted once; failures surface to the caller.
        let mut builder = Octocrab::builder().add_retry_config(RetryConfig::None);

        if let Some(url) = api_url {
            debug!("Using GitHub API base URL: {}", url);
            builder = builder
                .base_uri(url)
                .with_context(|| format!("Invalid GitHub API URL: {}", url))?;
        }

        let client = builder
            .personal_token(token)
            .build()
            .context("Failed to create GitHub client")?;

        Ok(Self { client })
    }

    /// Detect and obtain GitHub authentication
    fn detect_authentication() -> Result<(AuthStrategy, String)> {
        if let Ok(token) = Self::try_environment_token() {
            Ok((AuthStrategy::EnvironmentToken, token))
        } else if let Ok(token) = Self::try_github_cli() {
            Ok((AuthStrategy::GitHubCLI, token))
        } else {
            Err(anyhow!(
                "No GitHub authentication found. Please either:\n\
                 1. Set GITHUB_TOKEN environment variable\n\
                 2. Install and authenticate GitHub CLI: gh auth login"
            ))
        }
    }

    /// Try to get token from environment variable
    fn try_environment_token() -> Result<String> {
        debug!("Attempting environment variable authentication");

        let token = env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")?;

        if token.trim().is_empty() {
            return Err(anyhow!("GITHUB_TOKEN is empty"));
        }

        if !looks_like_github_token(&token) {
            warn!("GITHUB_TOKEN doesn't look like a GitHub token (expected a ghp_, gho_, ghs_ or github_pat_ prefix)");
        }

        Ok(token)
    }

    /// Try to get token from GitHub CLI
    fn try_github_cli() -> Result<String> {
        debug!("Attempting GitHub CLI authentication");

        let token_output = Command::new("gh")
            .args(["auth", "token"])
            .output()
            .context("Failed to run GitHub CLI (gh)")?;

        if !token_output.status.success() {
            return Err(anyhow!(
                "Failed to retrieve token from GitHub CLI: {}",
                String::from_utf8_lossy(&token_output.stderr)
            ));
        }

        let token = String::from_utf8(token_output.stdout)
            .context("GitHub CLI token is not valid UTF-8")?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(anyhow!("GitHub CLI returned empty token"));
        }

        debug!("Successfully obtained token from GitHub CLI");
        Ok(token)
    }
}

fn looks_like_github_token(token: &str) -> bool {
    ["ghp_", "gho_", "ghs_", "ghu_", "github_pat_"]
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// Turn an octocrab error into an error chain that keeps the API's own
/// explanation (status, message and per-field errors) under `action`.
fn api_error(err: octocrab::Error, action: String) -> anyhow::Error {
    let detail = match &err {
        octocrab::Error::GitHub { source, .. } => {
            let mut detail = format!("{} ({})", source.message, source.status_code);
            if let Some(errors) = source.errors.as_ref().filter(|e| !e.is_empty()) {
                detail.push_str(": ");
                detail.push_str(&serde_json::to_string(errors).unwrap_or_default());
            }
            detail
        }
        other => other.to_string(),
    };

    anyhow!(detail).context(action)
}

#[async_trait]
impl RulesetApi for GitHubClient {
    async fn list_rulesets(&self, owner: &str, repo: &str) -> Result<Vec<ExistingRuleset>> {
        let route = format!("/repos/{}/{}/rulesets", owner, repo);
        let mut rulesets = Vec::new();
        let mut page = 1u32;

        loop {
            let params = ListRulesetsParams {
                includes_parents: false,
                per_page: RULESETS_PER_PAGE,
                page,
            };

            let items: Vec<ExistingRuleset> = self
                .client
                .get(&route, Some(&params))
                .await
                .map_err(|e| {
                    api_error(
                        e,
                        format!("Failed to list rulesets for {}/{} page {}", owner, repo, page),
                    )
                })?;

            let fetched = items.len();
            rulesets.extend(items);

            if fetched < RULESETS_PER_PAGE as usize {
                break;
            }

            if page >= MAX_RULESET_PAGES {
                warn!(
                    "Reached maximum pagination limit ({} pages) for {}/{} rulesets",
                    MAX_RULESET_PAGES, owner, repo
                );
                break;
            }
            page += 1;
        }

        debug!("Found {} rulesets on {}/{}", rulesets.len(), owner, repo);
        Ok(rulesets)
    }

    async fn create_ruleset(&self, owner: &str, repo: &str, rule: &RuleConfig) -> Result<u64> {
        let route = format!("/repos/{}/{}/rulesets", owner, repo);

        let created: ExistingRuleset = self.client.post(route, Some(rule)).await.map_err(|e| {
            api_error(
                e,
                format!("Failed to create ruleset '{}' on {}/{}", rule.name, owner, repo),
            )
        })?;

        Ok(created.id)
    }

    async fn update_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset_id: u64,
        rule: &RuleConfig,
    ) -> Result<u64> {
        let route = format!("/repos/{}/{}/rulesets/{}", owner, repo, ruleset_id);

        let updated: ExistingRuleset = self.client.put(route, Some(rule)).await.map_err(|e| {
            api_error(
                e,
                format!(
                    "Failed to update ruleset '{}' (ID: {}) on {}/{}",
                    rule.name, ruleset_id, owner, repo
                ),
            )
        })?;

        Ok(updated.id)
    }
}
