// crates/update-harness-core/src/model/scenario.rs
// ============================================================================
// Module: Update Harness Scenario Model
// Description: Recorded scenario inputs and typed job outputs.
// Purpose: Hold the expected and actual outputs of one harness run.
// Dependencies: serde, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! A [`Scenario`] bundles the job input of a run with the ordered list of
//! outputs the job produced. Output payloads are kept as raw JSON and decoded
//! on demand; only `create_pull_request` payloads have a typed form here.
//! Scenario files are YAML (JSON is accepted as a YAML subset).
//! Keys the model does not interpret are kept in `extra` maps so a rewritten
//! scenario carries everything the user wrote. Explicit `null` lists read as
//! empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::credential::Credential;
use crate::model::job::Job;
use crate::model::null_as_default;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Output type emitted when a job opens a pull request.
pub const CREATE_PULL_REQUEST: &str = "create_pull_request";

/// Maximum scenario document size accepted by [`Scenario::from_yaml_str`].
pub const MAX_SCENARIO_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Recorded input and output bundle for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Job input, including credentials as written by the user.
    pub input: Input,
    /// Ordered job outputs.
    #[serde(deserialize_with = "null_as_default")]
    pub output: Vec<Output>,
    /// Scenario keys not interpreted here.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Scenario {
    /// Parses a scenario from YAML or JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Parse`] when the document is oversized or invalid.
    pub fn from_yaml_str(text: &str) -> Result<Self, ScenarioError> {
        if text.len() > MAX_SCENARIO_BYTES {
            return Err(ScenarioError::Parse("scenario exceeds size limit".to_string()));
        }
        serde_yaml::from_str(text).map_err(|err| ScenarioError::Parse(err.to_string()))
    }

    /// Renders the scenario as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Parse`] when serialization fails.
    pub fn to_yaml_string(&self) -> Result<String, ScenarioError> {
        serde_yaml::to_string(self).map_err(|err| ScenarioError::Parse(err.to_string()))
    }
}

/// Scenario input section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    /// Job descriptor.
    pub job: Job,
    /// Credentials exactly as supplied, placeholders unexpanded.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<Credential>,
    /// Input keys not interpreted here.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// One recorded job output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Output type discriminator.
    #[serde(rename = "type")]
    pub output_type: String,
    /// Expected payload.
    #[serde(default)]
    pub expect: UpdateWrapper,
    /// Output keys not interpreted here.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Output {
    /// Creates an output of the given type with a raw payload.
    #[must_use]
    pub fn new(output_type: impl Into<String>, data: Value) -> Self {
        Self {
            output_type: output_type.into(),
            expect: UpdateWrapper {
                data,
            },
            extra: BTreeMap::new(),
        }
    }

    /// Creates a `create_pull_request` output from a typed payload.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Parse`] when the payload cannot be encoded.
    pub fn create_pull_request(payload: &CreatePullRequest) -> Result<Self, ScenarioError> {
        let data =
            serde_json::to_value(payload).map_err(|err| ScenarioError::Parse(err.to_string()))?;
        Ok(Self::new(CREATE_PULL_REQUEST, data))
    }

    /// Returns true when this output records a pull request creation.
    #[must_use]
    pub fn is_create_pull_request(&self) -> bool {
        self.output_type == CREATE_PULL_REQUEST
    }
}

/// Wrapper around an output payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateWrapper {
    /// Raw payload.
    #[serde(default)]
    pub data: Value,
}

/// Payload of a `create_pull_request` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreatePullRequest {
    /// Commit the pull request is based on.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_commit_sha: String,
    /// Dependencies changed by the pull request.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<Dependency>,
    /// Files rewritten by the pull request.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub updated_dependency_files: Vec<DependencyFile>,
    /// Pull request title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pr_title: String,
    /// Pull request body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pr_body: String,
    /// Commit message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit_message: String,
}

/// Dependency entry of a pull request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dependency {
    /// Dependency name.
    pub name: String,
    /// Version the dependency was updated to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Version before the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// Manifest requirements after the update, kept opaque.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Value>,
    /// Directory the dependency lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// True when the update removed the dependency.
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
}

impl Dependency {
    /// Creates a dependency updated to `version`.
    #[must_use]
    pub fn updated(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            ..Self::default()
        }
    }

    /// Creates a dependency removed by the update.
    #[must_use]
    pub fn removed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            removed: true,
            ..Self::default()
        }
    }
}

/// File rewritten by an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DependencyFile {
    /// File name.
    pub name: String,
    /// Directory holding the file.
    #[serde(default)]
    pub directory: String,
    /// New file content.
    #[serde(default)]
    pub content: String,
    /// True when the file was deleted.
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

/// Serde helper for omitting false flags.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "Serde skip predicates take references.")]
const fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scenario data errors.
///
/// # Invariants
/// - Variants describe structural problems only; skipped dependencies are not errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    /// Scenario document could not be parsed or rendered.
    #[error("scenario parse error: {0}")]
    Parse(String),
    /// A recorded output has an invalid shape.
    #[error("malformed output at index {index}: {reason}")]
    MalformedOutput {
        /// Index of the output within the scenario.
        index: usize,
        /// Description of the structural problem.
        reason: String,
    },
}
