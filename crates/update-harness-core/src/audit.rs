// crates/update-harness-core/src/audit.rs
// ============================================================================
// Module: Harness Audit Logging
// Description: Structured audit events for access checks, expansion, and synthesis.
// Purpose: Emit redacted JSON-line logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines the audit event payloads emitted over a harness run and
//! the sinks that receive them. Events are serialized as one JSON object per
//! line so deployments can route them to any logging pipeline.
//!
//! Events carry credential indices, key names, and variable names only.
//! Secret values must never be placed into an event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::ignore::IgnoreReport;
use crate::ignore::SkippedDependency;
use crate::secrets::ExpansionReport;
use crate::secrets::PlaceholderRef;
use crate::secrets::UnexpandedRef;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Harness audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HarnessAuditEvent {
    /// Result of probing one credential.
    AccessProbe {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Index of the credential within the run.
        credential_index: usize,
        /// Endpoint that was probed.
        endpoint: String,
        /// Outcome label (`read_only`, `write_access`, `error`, `skipped`, `excluded`).
        outcome: &'static str,
        /// Scopes granted to the credential, when known.
        scopes: Vec<String>,
        /// Failure detail, when the probe failed.
        reason: Option<String>,
    },
    /// Final outcome of a pre-flight access check.
    AccessCheck {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Endpoint that was probed.
        endpoint: String,
        /// Outcome label (`allowed`, `write_access`, `error`, `cancelled`, `timeout`).
        outcome: &'static str,
        /// Number of credentials probed.
        probed: usize,
    },
    /// Result of secret expansion.
    SecretExpansion {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Resolved placeholders.
        expanded: Vec<PlaceholderRef>,
        /// Placeholders whose variable was unset.
        missing: Vec<PlaceholderRef>,
        /// `$`-prefixed values that named no valid variable.
        unexpanded: Vec<UnexpandedRef>,
    },
    /// Result of ignore-condition synthesis.
    IgnoreSynthesis {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Output identifier used as the condition source.
        source: String,
        /// Conditions appended.
        appended: usize,
        /// Dependencies skipped, with reasons.
        skipped: Vec<SkippedDependency>,
    },
}

impl HarnessAuditEvent {
    /// Builds an event for a single credential probe.
    #[must_use]
    pub fn access_probe(
        credential_index: usize,
        endpoint: &str,
        outcome: &'static str,
        scopes: Vec<String>,
        reason: Option<String>,
    ) -> Self {
        Self::AccessProbe {
            timestamp_ms: now_ms(),
            credential_index,
            endpoint: endpoint.to_string(),
            outcome,
            scopes,
            reason,
        }
    }

    /// Builds an event for a completed access check.
    #[must_use]
    pub fn access_check(endpoint: &str, outcome: &'static str, probed: usize) -> Self {
        Self::AccessCheck {
            timestamp_ms: now_ms(),
            endpoint: endpoint.to_string(),
            outcome,
            probed,
        }
    }

    /// Builds an event from a secret expansion report.
    #[must_use]
    pub fn secret_expansion(report: &ExpansionReport) -> Self {
        Self::SecretExpansion {
            timestamp_ms: now_ms(),
            expanded: report.expanded.clone(),
            missing: report.missing.clone(),
            unexpanded: report.unexpanded.clone(),
        }
    }

    /// Builds an event from an ignore synthesis report.
    #[must_use]
    pub fn ignore_synthesis(source: &str, report: &IgnoreReport) -> Self {
        Self::IgnoreSynthesis {
            timestamp_ms: now_ms(),
            source: source.to_string(),
            appended: report.appended,
            skipped: report.skipped.clone(),
        }
    }

    /// Returns the stable event label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AccessProbe {
                ..
            } => "access_probe",
            Self::AccessCheck {
                ..
            } => "access_check",
            Self::SecretExpansion {
                ..
            } => "secret_expansion",
            Self::IgnoreSynthesis {
                ..
            } => "ignore_synthesis",
        }
    }
}

/// Returns the current time in milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for harness events.
pub trait HarnessAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &HarnessAuditEvent);
}

/// Audit sink that discards events.
pub struct NoopAuditSink;

impl HarnessAuditSink for NoopAuditSink {
    fn record(&self, _event: &HarnessAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl HarnessAuditSink for StderrAuditSink {
    fn record(&self, event: &HarnessAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl HarnessAuditSink for FileAuditSink {
    fn record(&self, event: &HarnessAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that keeps events in memory, for inspection by callers.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<HarnessAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl HarnessAuditSink for MemoryAuditSink {
    fn record(&self, event: &HarnessAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
