// crates/update-harness-core/src/secrets.rs
// ============================================================================
// Module: Secret Expansion
// Description: Placeholder resolution for credential values.
// Purpose: Materialize live credentials while recording only placeholders.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Credential values written as `$NAME` (or `${NAME}`) are placeholders for
//! secrets held in the environment. [`expand_secrets`] records the credential
//! set exactly as written into the scenario, then replaces the run's live
//! credentials with a separately owned, materialized copy.
//!
//! Unset variables follow [`MissingSecretPolicy`]: shell-style substitution of
//! the empty string by default, or a hard failure when configured.
//! Values that start with `$` but name no valid variable pass through as
//! written and are listed in the report by location.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::model::Credential;
use crate::model::RunParams;
use crate::model::Scenario;

// ============================================================================
// SECTION: Secret Sources
// ============================================================================

/// Source of secret values for placeholder resolution.
pub trait SecretSource {
    /// Returns the value of the named secret, or `None` when unset.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Secret source backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl SecretSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl SecretSource for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

// ============================================================================
// SECTION: Policy and Reports
// ============================================================================

/// Behavior when a placeholder names an unset variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSecretPolicy {
    /// Substitute the empty string.
    #[default]
    Empty,
    /// Fail the expansion.
    Fail,
}

/// Placeholder that was resolved (or found unset) during expansion.
///
/// # Invariants
/// - Holds names only; never the resolved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderRef {
    /// Index of the credential within the run.
    pub credential_index: usize,
    /// Credential key holding the placeholder.
    pub key: String,
    /// Variable named by the placeholder.
    pub variable: String,
}

/// Credential value that starts with `$` but names no valid variable.
///
/// # Invariants
/// - Holds the location only; the value may be a literal secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnexpandedRef {
    /// Index of the credential within the run.
    pub credential_index: usize,
    /// Credential key holding the value.
    pub key: String,
}

/// Outcome of a secret expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionReport {
    /// Placeholders resolved from the secret source.
    pub expanded: Vec<PlaceholderRef>,
    /// Placeholders whose variable was unset and became empty.
    pub missing: Vec<PlaceholderRef>,
    /// `$`-prefixed values passed through unchanged (`$FOO-BAR`, `$my.token`).
    pub unexpanded: Vec<UnexpandedRef>,
}

/// Secret expansion errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    /// A placeholder named an unset variable under [`MissingSecretPolicy::Fail`].
    #[error("credential {credential_index} key {key} references unset variable {variable}")]
    MissingVariable {
        /// Index of the credential within the run.
        credential_index: usize,
        /// Credential key holding the placeholder.
        key: String,
        /// Variable named by the placeholder.
        variable: String,
    },
}

// ============================================================================
// SECTION: Expansion
// ============================================================================

/// Returns the variable named by a placeholder value.
///
/// Accepts `$NAME` and `${NAME}` spanning the whole value, where NAME matches
/// `[A-Za-z_][A-Za-z0-9_]*`. Anything else is not a placeholder.
#[must_use]
pub fn placeholder_name(value: &str) -> Option<&str> {
    let rest = value.strip_prefix('$')?;
    let name = rest.strip_prefix('{').and_then(|inner| inner.strip_suffix('}')).unwrap_or(rest);
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') { Some(name) } else { None }
}

/// Returns a materialized copy of `credentials` with placeholders resolved.
///
/// # Errors
///
/// Returns [`SecretError::MissingVariable`] for an unset variable when
/// `policy` is [`MissingSecretPolicy::Fail`].
pub fn materialize_credentials(
    credentials: &[Credential],
    source: &dyn SecretSource,
    policy: MissingSecretPolicy,
) -> Result<(Vec<Credential>, ExpansionReport), SecretError> {
    let mut report = ExpansionReport::default();
    let mut materialized = credentials.to_vec();
    for (credential_index, credential) in materialized.iter_mut().enumerate() {
        credential.try_for_each_value_mut(|key, value| {
            let Some(variable) = placeholder_name(value) else {
                if value.starts_with('$') {
                    report.unexpanded.push(UnexpandedRef {
                        credential_index,
                        key: key.to_string(),
                    });
                }
                return Ok(());
            };
            let placeholder = PlaceholderRef {
                credential_index,
                key: key.to_string(),
                variable: variable.to_string(),
            };
            match source.lookup(variable) {
                Some(resolved) => {
                    *value = resolved;
                    report.expanded.push(placeholder);
                }
                None if policy == MissingSecretPolicy::Fail => {
                    return Err(SecretError::MissingVariable {
                        credential_index,
                        key: placeholder.key,
                        variable: placeholder.variable,
                    });
                }
                None => {
                    value.clear();
                    report.missing.push(placeholder);
                }
            }
            Ok(())
        })?;
    }
    Ok((materialized, report))
}

/// Records the credentials as written and materializes the live set.
///
/// `recorder.input.credentials` receives the placeholder credentials before
/// any resolution. `params.credentials` is replaced only when expansion
/// succeeds; on error it keeps the placeholder values.
///
/// # Errors
///
/// Returns [`SecretError::MissingVariable`] for an unset variable when
/// `policy` is [`MissingSecretPolicy::Fail`].
pub fn expand_secrets(
    recorder: &mut Scenario,
    params: &mut RunParams,
    source: &dyn SecretSource,
    policy: MissingSecretPolicy,
) -> Result<ExpansionReport, SecretError> {
    recorder.input.credentials.clone_from(&params.credentials);
    let (materialized, report) = materialize_credentials(&params.credentials, source, policy)?;
    params.credentials = materialized;
    Ok(report)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
