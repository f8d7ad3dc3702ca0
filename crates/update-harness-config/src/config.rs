// crates/update-harness-config/src/config.rs
// ============================================================================
// Module: Update Harness Configuration
// Description: Configuration loading and validation for the harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: update-harness-access, update-harness-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `UPDATE_HARNESS_CONFIG`, then
//! `update-harness.toml` in the working directory. An explicit path must
//! exist; a missing default file yields the default configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use update_harness_access::AccessCheckConfig;
use update_harness_access::parse_endpoint;
use update_harness_core::FileAuditSink;
use update_harness_core::HarnessAuditSink;
use update_harness_core::MissingSecretPolicy;
use update_harness_core::NoopAuditSink;
use update_harness_core::StderrAuditSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "update-harness.toml";
/// Environment variable naming the configuration file.
const CONFIG_ENV_VAR: &str = "UPDATE_HARNESS_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum per-probe timeout in milliseconds.
const MIN_PROBE_TIMEOUT_MS: u64 = 100;
/// Maximum per-probe timeout in milliseconds.
const MAX_PROBE_TIMEOUT_MS: u64 = 60_000;
/// Maximum probes in flight.
const MAX_PROBE_CONCURRENCY: usize = 64;
/// Maximum number of extra write scopes.
const MAX_EXTRA_WRITE_SCOPES: usize = 128;
/// Maximum number of probed credential types.
const MAX_PROBE_TYPES: usize = 64;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Pre-flight access check settings.
    #[serde(default)]
    pub access: AccessCheckConfig,
    /// Secret expansion settings.
    #[serde(default)]
    pub secrets: SecretsConfig,
    /// Audit logging settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Secret expansion settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Behavior for placeholders naming unset variables.
    pub missing: MissingSecretPolicy,
}

/// Audit logging settings.
///
/// # Invariants
/// - When `enabled` is false no events are written.
/// - `path` selects an append-only file sink; stderr otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Whether audit events are written.
    pub enabled: bool,
    /// Optional JSON-lines file for audit events.
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Builds the audit sink described by this section.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the audit file cannot be opened.
    pub fn build_sink(&self) -> io::Result<Arc<dyn HarnessAuditSink>> {
        if !self.enabled {
            return Ok(Arc::new(NoopAuditSink));
        }
        match &self.path {
            Some(path) => Ok(Arc::new(FileAuditSink::new(Path::new(path.trim()))?)),
            None => Ok(Arc::new(StderrAuditSink)),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_access(&self.access)?;
        if let Some(path) = &self.audit.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the `[access]` section.
fn validate_access(access: &AccessCheckConfig) -> Result<(), ConfigError> {
    parse_endpoint(&access.api_endpoint)
        .map_err(|err| ConfigError::Invalid(format!("access.api_endpoint: {err}")))?;
    if !(MIN_PROBE_TIMEOUT_MS ..= MAX_PROBE_TIMEOUT_MS).contains(&access.timeout_ms) {
        return Err(ConfigError::Invalid(format!(
            "access.timeout_ms must be between {MIN_PROBE_TIMEOUT_MS} and {MAX_PROBE_TIMEOUT_MS}"
        )));
    }
    if !(1 ..= MAX_PROBE_CONCURRENCY).contains(&access.max_concurrency) {
        return Err(ConfigError::Invalid(format!(
            "access.max_concurrency must be between 1 and {MAX_PROBE_CONCURRENCY}"
        )));
    }
    if access.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("access.user_agent must be non-empty".to_string()));
    }
    if access.extra_write_scopes.len() > MAX_EXTRA_WRITE_SCOPES {
        return Err(ConfigError::Invalid("access.extra_write_scopes exceeds limit".to_string()));
    }
    for scope in &access.extra_write_scopes {
        if scope.is_empty() || scope.contains(|ch: char| ch == ',' || ch.is_whitespace()) {
            return Err(ConfigError::Invalid(format!(
                "access.extra_write_scopes entry is not a single scope: '{scope}'"
            )));
        }
    }
    if access.probe_types.len() > MAX_PROBE_TYPES {
        return Err(ConfigError::Invalid("access.probe_types exceeds limit".to_string()));
    }
    for kind in &access.probe_types {
        if kind.trim().is_empty() || kind.trim() != kind {
            return Err(ConfigError::Invalid(format!(
                "access.probe_types entry must be a non-empty type name: '{kind}'"
            )));
        }
    }
    Ok(())
}

/// Resolves the config path from the caller or environment defaults.
///
/// Returns the path and whether it was chosen explicitly.
fn resolve_path(
    path: Option<&Path>,
    env_path: Option<String>,
) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::path::PathBuf;

    use super::DEFAULT_CONFIG_NAME;
    use super::resolve_path;

    #[test]
    fn explicit_path_wins_over_env() {
        let resolved = resolve_path(Some(Path::new("cli.toml")), Some("env.toml".to_string()));
        assert!(matches!(resolved, Ok((path, true)) if path == PathBuf::from("cli.toml")));
    }

    #[test]
    fn env_path_is_explicit() {
        let resolved = resolve_path(None, Some("env.toml".to_string()));
        assert!(matches!(resolved, Ok((path, true)) if path == PathBuf::from("env.toml")));
    }

    #[test]
    fn default_path_is_not_explicit() {
        let resolved = resolve_path(None, None);
        assert!(matches!(resolved, Ok((path, false)) if path == PathBuf::from(DEFAULT_CONFIG_NAME)));
    }

    #[test]
    fn oversized_env_path_is_rejected() {
        assert!(resolve_path(None, Some("a".repeat(5_000))).is_err());
    }
}
