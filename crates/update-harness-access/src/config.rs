// crates/update-harness-access/src/config.rs
// ============================================================================
// Module: Access Check Configuration
// Description: Settings for the pre-flight scope probe.
// Purpose: Make the default endpoint and probe limits explicit values.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`AccessCheckConfig`] is the `[access]` section of the harness config. The
//! default API endpoint lives here rather than in process-wide state so tests
//! and multi-tenant callers can point checkers at different providers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Provider API endpoint used when a job does not override it.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.github.com";

/// Default per-probe timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default number of probes in flight at once.
const DEFAULT_MAX_CONCURRENCY: usize = 8;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the credential scope checker.
///
/// # Invariants
/// - `api_endpoint` is an `http` or `https` URL.
/// - `timeout_ms` applies to each probe's full request lifecycle.
/// - `max_concurrency` of zero is treated as one.
/// - An empty `probe_types` probes every credential that has a secret.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessCheckConfig {
    /// Endpoint probed when the job carries no `api-endpoint`.
    pub api_endpoint: String,
    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,
    /// User agent for outbound probes.
    pub user_agent: String,
    /// Maximum probes in flight.
    pub max_concurrency: usize,
    /// Additional scopes treated as write-capable.
    pub extra_write_scopes: Vec<String>,
    /// Credential types to probe; untyped credentials are always probed.
    pub probe_types: Vec<String>,
}

impl Default for AccessCheckConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: "update-harness/0.1".to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            extra_write_scopes: Vec::new(),
            probe_types: Vec::new(),
        }
    }
}
