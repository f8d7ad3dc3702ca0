// crates/update-harness-core/src/model/credential.rs
// ============================================================================
// Module: Update Harness Credentials
// Description: Typed credential records supplied to update runs.
// Purpose: Give credential maps a checked shape without losing open keys.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Credentials arrive as loosely shaped key/value maps. [`Credential`] keeps the
//! well-known keys as typed optional fields and preserves every other key in an
//! extension map, so a credential serializes back with exactly the keys the
//! user wrote. `Debug` output never prints secret material.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Extension key some registries use in place of `password`.
pub const LEGACY_PASSWORD_KEY: &str = "pass";

/// Placeholder printed in place of secret values.
const REDACTED: &str = "<redacted>";

// ============================================================================
// SECTION: Credential
// ============================================================================

/// Credential record for a single registry or source host.
///
/// # Invariants
/// - Known keys never appear in `extra`.
/// - Serialization emits only keys that were present on input.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Credential {
    /// Credential type (`git_source`, `npm_registry`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,
    /// Host the credential applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Registry URL the credential applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Username for basic authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for basic authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Provider-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Credential {
    /// Creates an empty credential.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a credential holding only an API token.
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Sets an extension key, returning the updated credential.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns the string value stored under `key`, known or extension.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let known = match key {
            "type" => &self.credential_type,
            "host" => &self.host,
            "url" => &self.url,
            "username" => &self.username,
            "password" => &self.password,
            "token" => &self.token,
            _ => return self.extra.get(key).and_then(Value::as_str),
        };
        known.as_deref()
    }

    /// Returns the secret used to authenticate against the provider API.
    ///
    /// Prefers `token`, then `password`, then the legacy `pass` key. Empty
    /// values are ignored.
    #[must_use]
    pub fn probe_secret(&self) -> Option<&str> {
        ["token", "password", LEGACY_PASSWORD_KEY]
            .into_iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.is_empty())
    }

    /// Visits every string value in the credential with its key.
    ///
    /// Non-string extension values (flags, numbers) are not visited.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `visit`.
    pub fn try_for_each_value_mut<E>(
        &mut self,
        mut visit: impl FnMut(&str, &mut String) -> Result<(), E>,
    ) -> Result<(), E> {
        let known: [(&str, &mut Option<String>); 6] = [
            ("type", &mut self.credential_type),
            ("host", &mut self.host),
            ("url", &mut self.url),
            ("username", &mut self.username),
            ("password", &mut self.password),
            ("token", &mut self.token),
        ];
        for (key, slot) in known {
            if let Some(value) = slot.as_mut() {
                visit(key, value)?;
            }
        }
        for (key, value) in &mut self.extra {
            if let Value::String(text) = value {
                visit(key, text)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extra_keys: Vec<&str> = self.extra.keys().map(String::as_str).collect();
        f.debug_struct("Credential")
            .field("credential_type", &self.credential_type)
            .field("host", &self.host)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("extra_keys", &extra_keys)
            .finish()
    }
}
