/// Common test utilities and helpers for rulesync tests

use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rulesync::{RuleConfig, RuleSet};

pub const NAMING_RULE: &str = "branch-naming-convention";
pub const PREVENT_DELETE_RULE: &str = "prevent-branch-deletion";

/// Ruleset files shipped with the crate
pub fn shipped_rule_paths() -> (PathBuf, PathBuf) {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs");
    (
        root.join("branch-naming-rule.json"),
        root.join("prevent-delete-rule.json"),
    )
}

pub fn shipped_rules() -> RuleSet {
    let (naming, prevent_delete) = shipped_rule_paths();
    RuleSet {
        naming: RuleConfig::load(&naming).expect("Failed to load naming rule"),
        prevent_delete: RuleConfig::load(&prevent_delete).expect("Failed to load prevent-delete rule"),
    }
}

/// Scratch directory for config and ruleset files
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let file = self.temp_dir.path().join(name);
        std::fs::write(&file, content).expect("Failed to write test file");
        file
    }
}

fn rulesets_path(org: &str, repo: &str) -> String {
    format!("/repos/{}/{}/rulesets", org, repo)
}

/// Listing endpoint returns `existing` as `(id, name)` pairs
pub async fn mount_list(server: &MockServer, org: &str, repo: &str, existing: &[(u64, &str)]) {
    let body: Vec<serde_json::Value> = existing
        .iter()
        .map(|(id, name)| {
            serde_json::json!({
                "id": id,
                "name": name,
                "target": "branch",
                "source_type": "Repository",
                "source": format!("{}/{}", org, repo),
                "enforcement": "active"
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(rulesets_path(org, repo)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Creation endpoint answers with `id` for any payload
pub async fn mount_create(server: &MockServer, org: &str, repo: &str, id: u64) {
    Mock::given(method("POST"))
        .and(path(rulesets_path(org, repo)))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": id, "name": "created"})),
        )
        .mount(server)
        .await;
}

/// Every rulesets call for the repository fails with `status`
pub async fn mount_failure(server: &MockServer, org: &str, repo: &str, status: u16) {
    Mock::given(path(rulesets_path(org, repo)))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "message": "Server Error",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .mount(server)
        .await;
}
