// crates/update-harness-core/src/model/params.rs
// ============================================================================
// Module: Update Harness Run Parameters
// Description: Per-invocation run configuration.
// Purpose: Carry the credential set and output identifier through a run.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`RunParams`] is created once per invocation by the orchestrator and mutated
//! in place: the secret expander swaps its credentials for the materialized set
//! and the ignore synthesizer reads its output identifier.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::model::credential::Credential;
use crate::model::job::Job;
use crate::model::null_as_default;

// ============================================================================
// SECTION: Run Parameters
// ============================================================================

/// Run configuration for one harness invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RunParams {
    /// Output identifier; becomes the source of synthesized ignore conditions.
    pub output: String,
    /// Credentials used for the run.
    #[serde(deserialize_with = "null_as_default")]
    pub credentials: Vec<Credential>,
    /// Job descriptor, when the run targets a specific job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    /// Run-shaping options not interpreted here.
    #[serde(flatten)]
    pub options: BTreeMap<String, Value>,
}

impl RunParams {
    /// Creates run parameters for the given output identifier and credentials.
    #[must_use]
    pub fn new(output: impl Into<String>, credentials: Vec<Credential>) -> Self {
        Self {
            output: output.into(),
            credentials,
            ..Self::default()
        }
    }
}
