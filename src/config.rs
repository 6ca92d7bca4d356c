use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Environment variable holding the organization name
pub const ORGANIZATION_ENV: &str = "ORGANIZATION";

/// Environment variable holding the JSON-encoded repository list
pub const REPOSITORIES_ENV: &str = "REPOSITORIES";

/// Environment variable overriding the GitHub API base URL
pub const API_URL_ENV: &str = "GITHUB_API_URL";

/// Rulesets compiled into the binary, used when no file is configured
const BUILTIN_NAMING_RULE: &str = include_str!("../configs/branch-naming-rule.json");
const BUILTIN_PREVENT_DELETE_RULE: &str = include_str!("../configs/prevent-delete-rule.json");

/// Main configuration structure for rulesync
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Organization that owns the target repositories
    pub organization: Option<String>,

    /// Repositories to process, in order
    pub repositories: Option<Vec<String>>,

    /// Ruleset definition files
    #[serde(default)]
    pub rules: RulesConfig,

    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locations of the two ruleset definitions; the built-in rulesets are used when unset
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RulesConfig {
    /// Branch naming pattern ruleset
    pub naming: Option<String>,

    /// Branch deletion prevention ruleset
    pub prevent_delete: Option<String>,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GitHubConfig {
    /// API base URL (GitHub Enterprise or a test server); api.github.com if unset
    pub api_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable colored console output
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            color: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Overlay ORGANIZATION, REPOSITORIES and GITHUB_API_URL from the environment
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(org) = non_empty_env(ORGANIZATION_ENV) {
            self.organization = Some(org);
        }

        if let Some(raw) = non_empty_env(REPOSITORIES_ENV) {
            let repos = parse_repositories(&raw)
                .with_context(|| format!("Invalid {} environment variable", REPOSITORIES_ENV))?;
            self.repositories = Some(repos);
        }

        if let Some(url) = non_empty_env(API_URL_ENV) {
            self.github.api_url = Some(url);
        }

        Ok(())
    }

    /// Expand `~` and environment variables in rule file paths
    pub fn expand_paths(&mut self) -> Result<()> {
        if let Some(path) = &self.rules.naming {
            let expanded = shellexpand::full(path).context("Failed to expand naming rule path")?;
            self.rules.naming = Some(expanded.into_owned());
        }

        if let Some(path) = &self.rules.prevent_delete {
            let expanded =
                shellexpand::full(path).context("Failed to expand prevent-delete rule path")?;
            self.rules.prevent_delete = Some(expanded.into_owned());
        }

        Ok(())
    }

    /// Organization name, required before any API call is made
    pub fn require_organization(&self) -> Result<&str> {
        match self.organization.as_deref() {
            Some(org) if !org.trim().is_empty() => Ok(org),
            _ => Err(anyhow!(
                "No organization configured. Set the {} environment variable or pass --org",
                ORGANIZATION_ENV
            )),
        }
    }

    /// Repository list, required before a run starts. An explicit empty list is allowed.
    pub fn require_repositories(&self) -> Result<&[String]> {
        self.repositories.as_deref().ok_or_else(|| {
            anyhow!(
                "No repositories configured. Set the {} environment variable to a JSON array of names",
                REPOSITORIES_ENV
            )
        })
    }

    /// Branch naming ruleset from the configured file, or the built-in one
    pub fn naming_rule(&self) -> Result<RuleConfig> {
        load_rule_or_builtin(self.rules.naming.as_deref(), BUILTIN_NAMING_RULE)
    }

    /// Deletion prevention ruleset from the configured file, or the built-in one
    pub fn prevent_delete_rule(&self) -> Result<RuleConfig> {
        load_rule_or_builtin(self.rules.prevent_delete.as_deref(), BUILTIN_PREVENT_DELETE_RULE)
    }
}

fn load_rule_or_builtin(path: Option<&str>, builtin: &str) -> Result<RuleConfig> {
    match path {
        Some(path) => RuleConfig::load(Path::new(path)),
        None => RuleConfig::from_json(builtin).context("Built-in ruleset is invalid"),
    }
}

/// Parse a JSON array of repository names, e.g. `["repo-a","repo-b"]`.
///
/// Blank names are kept so the run can report them as failed in place.
pub fn parse_repositories(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).context("Repository list must be a JSON array of strings")
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// A ruleset definition as authored on disk.
///
/// Only `name` is interpreted locally; it is how an existing ruleset is
/// recognised. Every other key is passed through untouched as part of the
/// request body, so the remote API owns schema validation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleConfig {
    pub name: String,

    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl RuleConfig {
    /// Load a ruleset definition from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ruleset file: {:?}", path))?;

        Self::from_json(&content).with_context(|| format!("Failed to parse ruleset file: {:?}", path))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let rule: RuleConfig =
            serde_json::from_str(content).context("Ruleset must be a JSON object with a name")?;

        if rule.name.trim().is_empty() {
            return Err(anyhow!("Ruleset name must not be empty"));
        }

        Ok(rule)
    }
}
