// crates/update-harness-core/tests/scenario_model.rs
// ============================================================================
// Module: Scenario Model Tests
// Description: Tests for credential and scenario serialization.
// Purpose: Ensure records keep user-written keys and never print secrets.
// Dependencies: update-harness-core, serde_json
// ============================================================================

//! ## Overview
//! Validates the scenario wire form: credential key preservation, secret
//! redaction in debug output, job endpoint resolution, YAML parsing, and
//! preservation of keys the model does not interpret.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use serde_json::json;
use update_harness_core::Credential;
use update_harness_core::Job;
use update_harness_core::RunParams;
use update_harness_core::Scenario;
use update_harness_core::ScenarioError;
use update_harness_core::Source;
use update_harness_core::generate_ignore_conditions;

// ============================================================================
// SECTION: Credentials
// ============================================================================

#[test]
fn credential_preserves_user_keys() {
    let raw = json!({
        "type": "npm_registry",
        "registry": "registry.example.com",
        "pass": "$NPM_PASS",
        "replaces-base": true
    });

    let credential: Credential = serde_json::from_value(raw.clone()).unwrap();

    assert_eq!(credential.credential_type.as_deref(), Some("npm_registry"));
    assert_eq!(credential.get("registry"), Some("registry.example.com"));
    assert_eq!(serde_json::to_value(&credential).unwrap(), raw);
}

#[test]
fn credential_debug_redacts_secrets() {
    let credential = Credential {
        username: Some("x-access-token".to_string()),
        password: Some("hunter2".to_string()),
        ..Credential::from_token("ghp_secret")
    }
    .with_extra("pass", "also-secret");

    let rendered = format!("{credential:?}");

    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("ghp_secret"));
    assert!(!rendered.contains("also-secret"));
    assert!(rendered.contains("x-access-token"));
    assert!(rendered.contains("pass"));
}

#[test]
fn probe_secret_prefers_token_then_password() {
    let both = Credential {
        password: Some("pw".to_string()),
        ..Credential::from_token("tok")
    };
    let password_only = Credential {
        password: Some("pw".to_string()),
        ..Credential::default()
    };
    let legacy = Credential::new().with_extra("pass", "legacy");
    let empty_token = Credential::from_token("");

    assert_eq!(both.probe_secret(), Some("tok"));
    assert_eq!(password_only.probe_secret(), Some("pw"));
    assert_eq!(legacy.probe_secret(), Some("legacy"));
    assert_eq!(empty_token.probe_secret(), None);
}

// ============================================================================
// SECTION: Jobs
// ============================================================================

#[test]
fn job_api_endpoint_ignores_blank_override() {
    let mut job = Job {
        source: Source {
            api_endpoint: Some("   ".to_string()),
            ..Source::default()
        },
        ..Job::default()
    };
    assert_eq!(job.api_endpoint(), None);

    job.source.api_endpoint = Some("https://ghe.example.com/api/v3".to_string());
    assert_eq!(job.api_endpoint(), Some("https://ghe.example.com/api/v3"));
}

// ============================================================================
// SECTION: Scenario Documents
// ============================================================================

#[test]
fn scenario_parses_from_yaml() {
    let text = r"
input:
  job:
    package-manager: npm_and_yarn
    source:
      provider: github
      repo: example/repo
      api-endpoint: https://api.github.com
    experiments:
      lockfile-only: true
  credentials:
    - type: git_source
      host: github.com
      username: x-access-token
      password: $LOCAL_GITHUB_ACCESS_TOKEN
output:
  - type: create_pull_request
    expect:
      data:
        base-commit-sha: abc123
        dependencies:
          - name: left-pad
            version: 1.3.0
            previous-version: 1.1.0
  - type: mark_as_processed
    expect:
      data:
        base-commit-sha: abc123
";

    let scenario = Scenario::from_yaml_str(text).unwrap();

    assert_eq!(scenario.output.len(), 2);
    assert!(scenario.output[0].is_create_pull_request());
    assert!(!scenario.output[1].is_create_pull_request());
    assert_eq!(scenario.input.job.package_manager.as_deref(), Some("npm_and_yarn"));
    assert!(scenario.input.job.extra.contains_key("experiments"));
    assert_eq!(
        scenario.input.credentials[0].password.as_deref(),
        Some("$LOCAL_GITHUB_ACCESS_TOKEN")
    );

    let rendered = scenario.to_yaml_string().unwrap();
    let reparsed = Scenario::from_yaml_str(&rendered).unwrap();
    assert_eq!(reparsed, scenario);
}

#[test]
fn scenario_parse_errors_are_reported() {
    let err = Scenario::from_yaml_str("output: [").unwrap_err();
    assert!(matches!(err, ScenarioError::Parse(_)));
}

#[test]
fn rewritten_scenario_keeps_unmodelled_keys() {
    let text = r"
description: grouped update
input:
  job:
    package-manager: bundler
    source:
      provider: github
      repo: example/repo
      commit: abc123
      directories:
        - /a
        - /b
    ignore-conditions:
      - dependency-name: rails
        source: earlier-run
        version-requirement: '>7.0.0'
        updated-at: 2024-01-01T00:00:00Z
  proxy-log: proxy.json
output:
  - type: create_pull_request
    expect:
      data:
        dependencies:
          - name: rack
            version: 3.0.0
";
    let mut scenario = Scenario::from_yaml_str(text).unwrap();

    let report =
        generate_ignore_conditions(&RunParams::new("this-run", Vec::new()), &mut scenario).unwrap();
    assert_eq!(report.appended, 1);

    let rendered = scenario.to_yaml_string().unwrap();
    let reparsed = Scenario::from_yaml_str(&rendered).unwrap();
    assert_eq!(reparsed, scenario);

    let source = &reparsed.input.job.source;
    assert_eq!(source.extra.get("commit"), Some(&json!("abc123")));
    assert_eq!(source.extra.get("directories"), Some(&json!(["/a", "/b"])));
    let conditions = &reparsed.input.job.ignore_conditions;
    assert_eq!(conditions.len(), 2);
    assert_eq!(conditions[0].extra.get("updated-at"), Some(&json!("2024-01-01T00:00:00Z")));
    assert_eq!(conditions[1].dependency_name, "rack");
    assert!(conditions[1].extra.is_empty());
    assert_eq!(reparsed.input.extra.get("proxy-log"), Some(&json!("proxy.json")));
    assert_eq!(reparsed.extra.get("description"), Some(&json!("grouped update")));
}

#[test]
fn null_lists_read_as_empty() {
    let text = r"
input:
  job:
    package-manager: npm_and_yarn
    dependencies:
    allowed-updates: null
    ignore-conditions:
  credentials:
output:
  - type: create_pull_request
    expect:
      data:
        dependencies:
";
    let mut scenario = Scenario::from_yaml_str(text).unwrap();

    assert!(scenario.input.job.dependencies.is_empty());
    assert!(scenario.input.job.allowed_updates.is_empty());
    assert!(scenario.input.job.ignore_conditions.is_empty());
    assert!(scenario.input.credentials.is_empty());

    let report =
        generate_ignore_conditions(&RunParams::new("out", Vec::new()), &mut scenario).unwrap();
    assert_eq!(report.appended, 0);
    assert!(report.skipped.is_empty());
}
