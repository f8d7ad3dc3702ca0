// crates/update-harness-core/src/model/mod.rs
// ============================================================================
// Module: Update Harness Models
// Description: Credential, job, scenario, and run parameter structures.
// Purpose: Provide serializable types shared by every harness component.
// Dependencies: serde, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! Model types mirror the job and scenario wire form (kebab-case keys). They
//! are the canonical source of truth for the access checker, the secret
//! expander, and the ignore synthesizer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod credential;
pub mod job;
pub mod params;
pub mod scenario;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credential::Credential;
pub use credential::LEGACY_PASSWORD_KEY;
pub use job::IgnoreCondition;
pub use job::Job;
pub use job::Source;
pub use params::RunParams;
pub use scenario::CREATE_PULL_REQUEST;
pub use scenario::CreatePullRequest;
pub use scenario::Dependency;
pub use scenario::DependencyFile;
pub use scenario::Input;
pub use scenario::MAX_SCENARIO_BYTES;
pub use scenario::Output;
pub use scenario::Scenario;
pub use scenario::ScenarioError;
pub use scenario::UpdateWrapper;

// ============================================================================
// SECTION: Serde Helpers
// ============================================================================

/// Deserializes an explicit `null` as the type's default.
///
/// YAML writes an empty list key (`dependencies:`) as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
