// crates/update-harness-core/src/scopes.rs
// ============================================================================
// Module: OAuth Scope Policy
// Description: Scope header parsing and write-capability classification.
// Purpose: Decide whether a credential's granted scopes are too broad.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Providers report granted OAuth scopes in a comma/space separated response
//! header. [`parse_scopes`] turns that header into a token set and
//! [`ScopePolicy`] flags the tokens that grant write access. Harness runs must
//! only ever hold read-limited credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Response header carrying the granted OAuth scopes.
pub const OAUTH_SCOPES_HEADER: &str = "x-oauth-scopes";

/// Scopes that grant write access on their own.
const DEFAULT_WRITE_SCOPES: &[&str] = &["repo", "public_repo", "workflow", "delete_repo"];

/// Scope prefixes that grant write access.
const DEFAULT_WRITE_PREFIXES: &[&str] = &["write:", "delete:", "admin:"];

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a scope header value into an ordered set of scope tokens.
///
/// Tokens are separated by commas and/or whitespace; empty tokens are dropped.
#[must_use]
pub fn parse_scopes(header: &str) -> BTreeSet<String> {
    header
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Classifies scope tokens as write-capable or read-only.
///
/// # Invariants
/// - Matching is exact and case-sensitive; `repo:status` is not `repo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePolicy {
    /// Scopes that are write-capable by exact match.
    write_scopes: BTreeSet<String>,
    /// Prefixes marking write-capable scopes.
    write_prefixes: Vec<String>,
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self {
            write_scopes: DEFAULT_WRITE_SCOPES.iter().map(|scope| (*scope).to_string()).collect(),
            write_prefixes: DEFAULT_WRITE_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_string())
                .collect(),
        }
    }
}

impl ScopePolicy {
    /// Returns the default policy extended with additional write-capable scopes.
    #[must_use]
    pub fn with_extra_write_scopes<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut policy = Self::default();
        policy.write_scopes.extend(extra.into_iter().map(Into::into));
        policy
    }

    /// Returns true when `scope` grants write access.
    #[must_use]
    pub fn is_write_scope(&self, scope: &str) -> bool {
        self.write_scopes.contains(scope)
            || self.write_prefixes.iter().any(|prefix| scope.starts_with(prefix.as_str()))
    }

    /// Returns the first write-capable scope in `scopes`, if any.
    #[must_use]
    pub fn first_write_scope<'a>(&self, scopes: &'a BTreeSet<String>) -> Option<&'a str> {
        scopes.iter().map(String::as_str).find(|scope| self.is_write_scope(scope))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
