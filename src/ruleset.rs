//! Ruleset application
//!
//! Ensures a named ruleset is present and current on one repository. The
//! existence check is a plain listing call; a ruleset with the same name is
//! updated in place, anything else is created. Failures are reported as an
//! [`ApplyOutcome`] and never returned as errors, so one bad repository can
//! never stop a run.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::RuleConfig;
use crate::console;

/// Summary of a ruleset as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExistingRuleset {
    pub id: u64,
    pub name: String,
}

/// Remote operations needed to keep a ruleset in place
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RulesetApi: Send + Sync {
    /// List rulesets defined directly on the repository
    async fn list_rulesets(&self, owner: &str, repo: &str) -> Result<Vec<ExistingRuleset>>;

    /// Create a new ruleset, returning its id
    async fn create_ruleset(&self, owner: &str, repo: &str, rule: &RuleConfig) -> Result<u64>;

    /// Replace an existing ruleset by id
    async fn update_ruleset(
        &self,
        owner: &str,
        repo: &str,
        ruleset_id: u64,
        rule: &RuleConfig,
    ) -> Result<u64>;
}

/// Result of applying one ruleset to one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created { id: u64 },
    Updated { id: u64 },
    Failed { error: String },
}

impl ApplyOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ApplyOutcome::Failed { .. })
    }
}

/// Create or update `rule` on `owner/repo`.
pub async fn apply_ruleset<A: RulesetApi + ?Sized>(
    api: &A,
    owner: &str,
    repo: &str,
    rule: &RuleConfig,
) -> ApplyOutcome {
    console::info(&format!(
        "Applying ruleset '{}' to {}/{}",
        rule.name, owner, repo
    ));

    match try_apply(api, owner, repo, rule).await {
        Ok(outcome) => {
            match &outcome {
                ApplyOutcome::Created { id } => {
                    debug!(ruleset_id = id, "created ruleset '{}' on {}/{}", rule.name, owner, repo);
                    console::success(&format!("Created ruleset '{}' successfully", rule.name));
                }
                ApplyOutcome::Updated { id } => {
                    debug!(ruleset_id = id, "updated ruleset '{}' on {}/{}", rule.name, owner, repo);
                    console::success(&format!("Updated ruleset '{}' successfully", rule.name));
                }
                ApplyOutcome::Failed { .. } => {}
            }
            outcome
        }
        Err(e) => {
            error!("Failed to apply ruleset '{}' to {}/{}: {:#}", rule.name, owner, repo, e);
            console::failure(&format!("Error applying ruleset '{}': {}", rule.name, e));
            for detail in e.chain().skip(1) {
                console::failure(&format!("Details: {}", detail));
            }
            ApplyOutcome::Failed {
                error: format!("{:#}", e),
            }
        }
    }
}

async fn try_apply<A: RulesetApi + ?Sized>(
    api: &A,
    owner: &str,
    repo: &str,
    rule: &RuleConfig,
) -> Result<ApplyOutcome> {
    let existing = api.list_rulesets(owner, repo).await?;

    match existing.iter().find(|r| r.name == rule.name) {
        Some(current) => {
            console::warning(&format!(
                "Rule '{}' already exists (ID: {}). Updating...",
                rule.name, current.id
            ));
            let id = api.update_ruleset(owner, repo, current.id, rule).await?;
            Ok(ApplyOutcome::Updated { id })
        }
        None => {
            let id = api.create_ruleset(owner, repo, rule).await?;
            Ok(ApplyOutcome::Created { id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use assert_matches::assert_matches;
    use mockall::predicate::always;

    fn rule(name: &str) -> RuleConfig {
        RuleConfig::from_json(&format!(r#"{{"name": "{}", "target": "branch"}}"#, name)).unwrap()
    }

    #[tokio::test]
    async fn test_creates_when_absent() {
        let mut api = MockRulesetApi::new();
        api.expect_list_rulesets().times(1).returning(|_, _| {
            Ok(vec![ExistingRuleset {
                id: 7,
                name: "something-else".to_string(),
            }])
        });
        api.expect_create_ruleset()
            .times(1)
            .withf(|owner, repo, rule| {
                owner.to_string() == "acme" && repo.to_string() == "repo-a" && rule.name == "branch-naming"
            })
            .returning(|_, _, _| Ok(11));
        api.expect_update_ruleset().never();

        let outcome = apply_ruleset(&api, "acme", "repo-a", &rule("branch-naming")).await;
        assert_eq!(outcome, ApplyOutcome::Created { id: 11 });
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_updates_existing_by_id() {
        let mut api = MockRulesetApi::new();
        api.expect_list_rulesets().times(1).returning(|_, _| {
            Ok(vec![
                ExistingRuleset {
                    id: 3,
                    name: "prevent-delete".to_string(),
                },
                ExistingRuleset {
                    id: 42,
                    name: "branch-naming".to_string(),
                },
            ])
        });
        api.expect_update_ruleset()
            .times(1)
            .with(always(), always(), mockall::predicate::eq(42), always())
            .returning(|_, _, id, _| Ok(id));
        api.expect_create_ruleset().never();

        let outcome = apply_ruleset(&api, "acme", "repo-a", &rule("branch-naming")).await;
        assert_eq!(outcome, ApplyOutcome::Updated { id: 42 });
    }

    #[tokio::test]
    async fn test_list_failure_is_absorbed() {
        let mut api = MockRulesetApi::new();
        api.expect_list_rulesets()
            .returning(|_, _| Err(anyhow!("401 Bad credentials")));
        api.expect_create_ruleset().never();
        api.expect_update_ruleset().never();

        let outcome = apply_ruleset(&api, "acme", "repo-a", &rule("branch-naming")).await;
        assert_matches!(outcome, ApplyOutcome::Failed { ref error } if error.contains("Bad credentials"));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_create_failure_is_absorbed() {
        let mut api = MockRulesetApi::new();
        api.expect_list_rulesets().returning(|_, _| Ok(Vec::new()));
        api.expect_create_ruleset()
            .times(1)
            .returning(|_, _, _| Err(anyhow!("422 Validation Failed").context("create failed")));

        let outcome = apply_ruleset(&api, "acme", "repo-a", &rule("branch-naming")).await;
        assert_matches!(outcome, ApplyOutcome::Failed { ref error } if error.contains("Validation Failed"));
    }

    #[tokio::test]
    async fn test_update_failure_is_absorbed() {
        let mut api = MockRulesetApi::new();
        api.expect_list_rulesets().returning(|_, _| {
            Ok(vec![ExistingRuleset {
                id: 5,
                name: "branch-naming".to_string(),
            }])
        });
        api.expect_update_ruleset()
            .times(1)
            .returning(|_, _, _, _| Err(anyhow!("404 Not Found")));
        api.expect_create_ruleset().never();

        let outcome = apply_ruleset(&api, "acme", "repo-a", &rule("branch-naming")).await;
        assert_matches!(outcome, ApplyOutcome::Failed { .. });
    }

    #[test]
    fn test_existing_ruleset_ignores_extra_fields() {
        let json = r#"[{"id": 1, "name": "n", "target": "branch", "source_type": "Repository"}]"#;
        let parsed: Vec<ExistingRuleset> = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            vec![ExistingRuleset {
                id: 1,
                name: "n".to_string()
            }]
        );
    }
}
