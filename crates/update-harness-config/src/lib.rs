// crates/update-harness-config/src/lib.rs
// ============================================================================
// Module: Update Harness Config
// Description: Configuration model and loader for the harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: update-harness-access, update-harness-core, serde, toml
// ============================================================================

//! ## Overview
//! Loads `update-harness.toml` and validates the access, secrets, and audit
//! sections before any run starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::ConfigError;
pub use config::HarnessConfig;
pub use config::SecretsConfig;
