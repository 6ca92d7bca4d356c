//! Apply Engine - drives ruleset application across repositories
//!
//! Repositories are processed strictly one after another. Each repository
//! gets both rulesets attempted independently, and a repository counts as
//! applied when at least one of them succeeded.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::RuleConfig;
use crate::console;
use crate::ruleset::{apply_ruleset, ApplyOutcome, RulesetApi};

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_repos: usize,
    pub rules_applied: usize,
    pub rules_failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    fn record(&mut self, report: &RepositoryReport) {
        if report.any_applied() {
            self.rules_applied += 1;
        } else {
            self.rules_failed += 1;
        }
    }
}

/// Per-repository outcome of both ruleset applications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReport {
    pub repository: String,
    pub naming: ApplyOutcome,
    pub prevent_delete: ApplyOutcome,
}

impl RepositoryReport {
    pub fn applied_count(&self) -> usize {
        [&self.naming, &self.prevent_delete]
            .iter()
            .filter(|o| o.is_success())
            .count()
    }

    pub fn any_applied(&self) -> bool {
        self.applied_count() > 0
    }
}

/// The two rulesets every repository receives
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub naming: RuleConfig,
    pub prevent_delete: RuleConfig,
}

/// Applies a [`RuleSet`] to every repository of an organization
pub struct ApplyEngine<A> {
    api: A,
    organization: String,
    rules: RuleSet,
}

impl<A: RulesetApi> ApplyEngine<A> {
    pub fn new(api: A, organization: impl Into<String>, rules: RuleSet) -> Self {
        Self {
            api,
            organization: organization.into(),
            rules,
        }
    }

    /// Apply both rulesets to one repository
    pub async fn process_repository(&self, repo: &str) -> RepositoryReport {
        console::heading(&format!("🔄 PROCESSING: {}/{}", self.organization, repo));

        // Both rulesets are attempted even when the first fails.
        let naming = apply_ruleset(&self.api, &self.organization, repo, &self.rules.naming).await;
        let prevent_delete =
            apply_ruleset(&self.api, &self.organization, repo, &self.rules.prevent_delete).await;

        let report = RepositoryReport {
            repository: repo.to_string(),
            naming,
            prevent_delete,
        };

        if report.any_applied() {
            console::success(&format!(
                "Successfully applied {}/2 rules to {}/{}",
                report.applied_count(),
                self.organization,
                repo
            ));
        } else {
            console::alert(&format!(
                "Failed to apply any rules to {}/{}",
                self.organization, repo
            ));
        }

        debug!(
            applied = report.applied_count(),
            "finished {}/{}", self.organization, repo
        );
        report
    }

    /// Process every repository in order and return the run counters
    pub async fn run(&self, repositories: &[String]) -> RunSummary {
        let start_time = Instant::now();

        console::info(&format!(
            "Starting branch protection rules application for {} repositories",
            repositories.len()
        ));
        info!(
            "Applying rulesets '{}' and '{}' to {} repositories in {}",
            self.rules.naming.name,
            self.rules.prevent_delete.name,
            repositories.len(),
            self.organization
        );

        let mut summary = RunSummary {
            total_repos: repositories.len(),
            ..RunSummary::default()
        };

        for (index, repo) in repositories.iter().enumerate() {
            if repo.trim().is_empty() {
                warn!("Repository list entry {} is blank, counting it as failed", index);
                console::alert(&format!(
                    "Skipping blank repository name at position {}",
                    index
                ));
                summary.rules_failed += 1;
                continue;
            }

            let report = self.process_repository(repo).await;
            summary.record(&report);
        }

        summary.duration = start_time.elapsed();

        info!(
            "Run completed in {:.2}s: {} applied, {} failed",
            summary.duration.as_secs_f64(),
            summary.rules_applied,
            summary.rules_failed
        );

        summary
    }
}

/// Print the fixed-format summary block
pub fn print_summary(summary: &RunSummary) {
    println!();
    console::info("ℹ️ SUMMARY");
    console::info(&format!(
        "ℹ️ Total repositories processed: {}",
        summary.total_repos
    ));
    console::success(&format!(
        "Repositories with rules applied successfully: {}/{}",
        summary.rules_applied, summary.total_repos
    ));
    console::alert(&format!(
        "Repositories with failed rule application: {}",
        summary.rules_failed
    ));
    console::info(&format!(
        "⏱️ Duration: {:.2}s",
        summary.duration.as_secs_f64()
    ));
}
