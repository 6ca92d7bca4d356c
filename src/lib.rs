//! rulesync - Branch-protection rulesets across an organization
//!
//! rulesync makes sure every listed repository of a GitHub organization
//! carries two rulesets: one enforcing branch naming, one preventing branch
//! deletion. Existing rulesets with the same name are updated in place.
//!
//! ## Modules
//!
//! - [`config`]: Configuration, ruleset files and repository lists
//! - [`github`]: GitHub API client and authentication
//! - [`ruleset`]: Create-or-update of a single ruleset
//! - [`apply`]: Sequential run over all repositories

pub mod apply;
pub mod config;
pub mod console;
pub mod github;
pub mod ruleset;

pub use apply::{ApplyEngine, RepositoryReport, RuleSet, RunSummary};
pub use config::{Config, RuleConfig};
pub use github::GitHubClient;
pub use ruleset::{apply_ruleset, ApplyOutcome, ExistingRuleset, RulesetApi};
