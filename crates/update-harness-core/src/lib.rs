// crates/update-harness-core/src/lib.rs
// ============================================================================
// Module: Update Harness Core Library
// Description: Public API surface for the Update Harness core.
// Purpose: Expose run models, secret expansion, scope policy, and ignore synthesis.
// Dependencies: crate::{model, scopes, secrets, ignore, audit}
// ============================================================================

//! ## Overview
//! Update Harness core holds the run-validation and scenario-reconciliation
//! logic that wraps a dependency-update job: the credential and scenario
//! models, the scope policy used by the pre-flight access gate, placeholder
//! secret expansion, and post-run ignore-condition synthesis. It performs no
//! network I/O; the access probe lives in `update-harness-access`.
//!
//! Security posture: credential values are secrets and must never reach
//! recorded scenarios or audit output in resolved form.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod ignore;
pub mod model;
pub mod scopes;
pub mod secrets;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::HarnessAuditEvent;
pub use audit::HarnessAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use ignore::IgnoreReport;
pub use ignore::SkipReason;
pub use ignore::SkippedDependency;
pub use ignore::generate_ignore_conditions;
pub use model::*;
pub use scopes::OAUTH_SCOPES_HEADER;
pub use scopes::ScopePolicy;
pub use scopes::parse_scopes;
pub use secrets::ExpansionReport;
pub use secrets::MissingSecretPolicy;
pub use secrets::ProcessEnv;
pub use secrets::SecretError;
pub use secrets::SecretSource;
pub use secrets::UnexpandedRef;
pub use secrets::expand_secrets;
pub use secrets::materialize_credentials;
pub use secrets::placeholder_name;
