// crates/update-harness-core/src/ignore.rs
// ============================================================================
// Module: Ignore-Condition Synthesis
// Description: Derive suppression rules from a completed run's outputs.
// Purpose: Keep the next run from proposing updates this run already made.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! After a run, every dependency a `create_pull_request` output updated is
//! turned into an [`IgnoreCondition`] suppressing versions above the one
//! just applied. Removed dependencies stay eligible for re-evaluation and
//! dependencies without a version are reported, not suppressed.
//!
//! Conditions are appended to the scenario job, never replacing or
//! deduplicating existing ones. Synthesis is all-or-nothing: a structural
//! error leaves the scenario untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::model::CreatePullRequest;
use crate::model::IgnoreCondition;
use crate::model::RunParams;
use crate::model::Scenario;
use crate::model::ScenarioError;

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Reason a pull-request dependency produced no ignore condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The update removed the dependency.
    Removed,
    /// The dependency carries no version to suppress from.
    MissingVersion,
}

impl SkipReason {
    /// Returns a stable label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::MissingVersion => "missing_version",
        }
    }
}

/// Dependency skipped during synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDependency {
    /// Index of the output within the scenario.
    pub output_index: usize,
    /// Dependency name.
    pub name: String,
    /// Why no condition was produced.
    pub reason: SkipReason,
}

/// Outcome of ignore-condition synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IgnoreReport {
    /// Number of conditions appended to the job.
    pub appended: usize,
    /// Dependencies that produced no condition.
    pub skipped: Vec<SkippedDependency>,
}

impl IgnoreReport {
    /// Returns dependencies skipped for lack of a version.
    ///
    /// These usually point at an upstream recording problem.
    pub fn missing_versions(&self) -> impl Iterator<Item = &SkippedDependency> {
        self.skipped.iter().filter(|skipped| skipped.reason == SkipReason::MissingVersion)
    }
}

// ============================================================================
// SECTION: Synthesis
// ============================================================================

/// Appends ignore conditions for every dependency the scenario's pull
/// requests updated.
///
/// Each condition uses `params.output` as its source and `">" + version` as
/// its version requirement. Outputs other than `create_pull_request` are
/// ignored.
///
/// # Errors
///
/// Returns [`ScenarioError::MalformedOutput`] when a `create_pull_request`
/// payload does not decode or names a dependency with an empty name. No
/// conditions are appended in that case.
pub fn generate_ignore_conditions(
    params: &RunParams,
    scenario: &mut Scenario,
) -> Result<IgnoreReport, ScenarioError> {
    let mut conditions = Vec::new();
    let mut report = IgnoreReport::default();

    for (index, output) in scenario.output.iter().enumerate() {
        if !output.is_create_pull_request() {
            continue;
        }
        let payload = CreatePullRequest::deserialize(&output.expect.data).map_err(|err| {
            ScenarioError::MalformedOutput {
                index,
                reason: err.to_string(),
            }
        })?;
        for dependency in payload.dependencies {
            if dependency.name.trim().is_empty() {
                return Err(ScenarioError::MalformedOutput {
                    index,
                    reason: "dependency name must be non-empty".to_string(),
                });
            }
            if dependency.removed {
                report.skipped.push(SkippedDependency {
                    output_index: index,
                    name: dependency.name,
                    reason: SkipReason::Removed,
                });
                continue;
            }
            let Some(version) = dependency.version.as_deref() else {
                report.skipped.push(SkippedDependency {
                    output_index: index,
                    name: dependency.name,
                    reason: SkipReason::MissingVersion,
                });
                continue;
            };
            conditions.push(IgnoreCondition::above_version(
                dependency.name,
                params.output.clone(),
                version,
            ));
        }
    }

    report.appended = conditions.len();
    scenario.input.job.ignore_conditions.extend(conditions);
    Ok(report)
}
