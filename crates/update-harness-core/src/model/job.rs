// crates/update-harness-core/src/model/job.rs
// ============================================================================
// Module: Update Harness Job Model
// Description: Update job descriptor and persisted ignore conditions.
// Purpose: Model the job fields consumed by access checks and ignore synthesis.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Job`] describes one dependency-update job. Only the source endpoint and
//! the ignore-condition list are interpreted by this crate; every other job key
//! is preserved verbatim so rewritten scenarios keep the user's job intact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::model::null_as_default;

// ============================================================================
// SECTION: Job
// ============================================================================

/// Update job descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Job {
    /// Package manager the job targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
    /// Repository source for the job.
    pub source: Source,
    /// Dependencies the job is limited to.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Allowed update rules, kept opaque.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub allowed_updates: Vec<Value>,
    /// Accumulated suppression rules for future runs.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub ignore_conditions: Vec<IgnoreCondition>,
    /// Job keys not interpreted here.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Job {
    /// Returns the job's API endpoint override when set and non-empty.
    #[must_use]
    pub fn api_endpoint(&self) -> Option<&str> {
        self.source.api_endpoint.as_deref().map(str::trim).filter(|endpoint| !endpoint.is_empty())
    }
}

/// Repository source of an update job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Source {
    /// Source-control provider (`github`, `azure`, ...).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
    /// Repository name (`owner/name`).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repo: String,
    /// Directory within the repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Branch to update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Provider hostname for self-hosted deployments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Provider API endpoint for self-hosted deployments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    /// Source keys not interpreted here (`commit`, `directories`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Ignore Conditions
// ============================================================================

/// Rule telling a future run not to propose an update again.
///
/// # Invariants
/// - `version_requirement` uses the package manager's requirement syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IgnoreCondition {
    /// Dependency the rule applies to.
    pub dependency_name: String,
    /// Origin of the rule (the run output identifier for synthesized rules).
    pub source: String,
    /// Versions to suppress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_requirement: Option<String>,
    /// Semver update types to suppress.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub update_types: Vec<String>,
    /// Condition keys not interpreted here (`updated-at`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl IgnoreCondition {
    /// Builds a rule suppressing every version above `version`.
    #[must_use]
    pub fn above_version(
        dependency_name: impl Into<String>,
        source: impl Into<String>,
        version: &str,
    ) -> Self {
        Self {
            dependency_name: dependency_name.into(),
            source: source.into(),
            version_requirement: Some(format!(">{version}")),
            ..Self::default()
        }
    }
}
