// crates/update-harness-access/src/lib.rs
// ============================================================================
// Module: Update Harness Access
// Description: Pre-flight credential scope checking.
// Purpose: Refuse to run a job whose credentials could write to the provider.
// Dependencies: update-harness-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! This crate probes the provider API once per credential and inspects the
//! granted OAuth scopes. Any write-capable scope aborts the run before a job
//! starts. Probes run concurrently and honor cancellation and an optional
//! overall deadline.
//! Invariants:
//! - A probe that could not complete is never read as "no write access".
//! - Credential sets are read, never mutated.
//!
//! Security posture: credential secrets are sent only as bearer headers and
//! never appear in errors or audit events.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cancel;
pub mod checker;
pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cancel::CancelHandle;
pub use cancel::CancelToken;
pub use cancel::ProbeContext;
pub use cancel::cancel_pair;
pub use checker::AccessChecker;
pub use checker::AccessError;
pub use checker::AccessReport;
pub use checker::ProbeResult;
pub use checker::parse_endpoint;
pub use config::AccessCheckConfig;
pub use config::DEFAULT_API_ENDPOINT;
