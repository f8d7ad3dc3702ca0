// crates/update-harness-access/src/checker.rs
// ============================================================================
// Module: Credential Scope Checker
// Description: Concurrent OAuth scope probes against the provider API.
// Purpose: Reject credential sets that grant write access before a run.
// Dependencies: update-harness-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! [`AccessChecker`] issues one bounded `GET <endpoint>/` per credential with
//! the credential's secret as a bearer token and classifies the scopes in the
//! `X-OAuth-Scopes` response header. Probes run on a [`JoinSet`]; the first
//! error observed wins and dropping the set aborts the remaining probes.
//! Redirects are not followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::Url;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use thiserror::Error;
use tokio::task::JoinSet;
use update_harness_core::Credential;
use update_harness_core::HarnessAuditEvent;
use update_harness_core::HarnessAuditSink;
use update_harness_core::Job;
use update_harness_core::NoopAuditSink;
use update_harness_core::OAUTH_SCOPES_HEADER;
use update_harness_core::ScopePolicy;
use update_harness_core::parse_scopes;

use crate::cancel::ProbeContext;
use crate::config::AccessCheckConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type requested from the provider API.
const PROVIDER_JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Access check errors.
///
/// # Invariants
/// - Only [`AccessError::WriteAccess`] means a credential is too broad; every
///   other variant means the check could not be completed.
/// - Messages never contain credential secrets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// A credential holds a write-capable scope.
    #[error("credential {credential_index} grants write-capable scope {scope}")]
    WriteAccess {
        /// Index of the offending credential.
        credential_index: usize,
        /// First write-capable scope found.
        scope: String,
    },
    /// A probe failed (transport, timeout, or non-success status).
    #[error("access probe for credential {credential_index} failed: {reason}")]
    Probe {
        /// Index of the credential being probed.
        credential_index: usize,
        /// Failure detail.
        reason: String,
    },
    /// The overall deadline passed before every probe finished.
    #[error("access check deadline exceeded")]
    Timeout,
    /// The check was cancelled.
    #[error("access check cancelled")]
    Cancelled,
    /// A probe task stopped without producing a result.
    #[error("access probe task failed: {0}")]
    Task(String),
    /// Invalid checker configuration or endpoint.
    #[error("access check config error: {0}")]
    Config(String),
}

impl AccessError {
    /// Returns the audit outcome label for this error.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::WriteAccess {
                ..
            } => "write_access",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Probe {
                ..
            }
            | Self::Task(_)
            | Self::Config(_) => "error",
        }
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Scopes observed for one probed credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Index of the credential within the run.
    pub credential_index: usize,
    /// Granted scopes, ordered.
    pub scopes: Vec<String>,
}

/// Outcome of a successful access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessReport {
    /// Endpoint probed.
    pub endpoint: String,
    /// Probed credentials, ordered by index.
    pub probed: Vec<ProbeResult>,
    /// Indices of credentials with no secret to probe.
    pub skipped: Vec<usize>,
    /// Indices of credentials whose type is outside `probe_types`.
    pub excluded: Vec<usize>,
}

// ============================================================================
// SECTION: Checker
// ============================================================================

/// Credential scope checker.
///
/// # Invariants
/// - `default_endpoint` is a parsed `http`/`https` URL ending in `/`.
/// - `max_concurrency` is at least one.
/// - An empty `probe_types` set probes every credential.
pub struct AccessChecker {
    /// HTTP client shared by every probe.
    client: Client,
    /// Endpoint used when the job does not override it.
    default_endpoint: Url,
    /// Write-capability classification.
    policy: ScopePolicy,
    /// Maximum probes in flight.
    max_concurrency: usize,
    /// Credential types to probe.
    probe_types: BTreeSet<String>,
    /// Audit sink for probe and check events.
    audit: Arc<dyn HarnessAuditSink>,
}

impl AccessChecker {
    /// Creates a checker from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Config`] when the default endpoint is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: AccessCheckConfig) -> Result<Self, AccessError> {
        let default_endpoint = parse_endpoint(&config.api_endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| AccessError::Config(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            default_endpoint,
            policy: ScopePolicy::with_extra_write_scopes(config.extra_write_scopes),
            max_concurrency: config.max_concurrency.max(1),
            probe_types: config.probe_types.into_iter().collect(),
            audit: Arc::new(NoopAuditSink),
        })
    }

    /// Routes probe and check events to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn HarnessAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the endpoint a check for `job` would probe.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Config`] when the job's endpoint is invalid.
    pub fn resolve_endpoint(&self, job: Option<&Job>) -> Result<Url, AccessError> {
        match job.and_then(Job::api_endpoint) {
            Some(endpoint) => parse_endpoint(endpoint),
            None => Ok(self.default_endpoint.clone()),
        }
    }

    /// Probes every credential and fails if any grants write access.
    ///
    /// Credentials with no token, password, or `pass` value are not probed
    /// and are listed in [`AccessReport::skipped`]. Typed credentials outside
    /// a non-empty `probe_types` are listed in [`AccessReport::excluded`].
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::WriteAccess`] for a write-capable scope, and
    /// [`AccessError::Probe`], [`AccessError::Timeout`],
    /// [`AccessError::Cancelled`], [`AccessError::Task`], or
    /// [`AccessError::Config`] when the check could not be completed.
    pub async fn check_access(
        &self,
        ctx: &ProbeContext,
        job: Option<&Job>,
        credentials: &[Credential],
    ) -> Result<AccessReport, AccessError> {
        let endpoint = match self.resolve_endpoint(job) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                self.audit.record(&HarnessAuditEvent::access_check("", err.outcome(), 0));
                return Err(err);
            }
        };
        let mut pending = VecDeque::new();
        let mut skipped = Vec::new();
        let mut excluded = Vec::new();
        for (index, credential) in credentials.iter().enumerate() {
            if !self.probes_type(credential) {
                self.audit.record(&HarnessAuditEvent::access_probe(
                    index,
                    endpoint.as_str(),
                    "excluded",
                    Vec::new(),
                    None,
                ));
                excluded.push(index);
                continue;
            }
            match credential.probe_secret() {
                Some(secret) => pending.push_back((index, secret.to_string())),
                None => {
                    self.audit.record(&HarnessAuditEvent::access_probe(
                        index,
                        endpoint.as_str(),
                        "skipped",
                        Vec::new(),
                        None,
                    ));
                    skipped.push(index);
                }
            }
        }
        let probed = pending.len();
        let result = self.run_probes(ctx, &endpoint, pending).await;
        let outcome = match &result {
            Ok(_) => "allowed",
            Err(err) => err.outcome(),
        };
        self.audit.record(&HarnessAuditEvent::access_check(endpoint.as_str(), outcome, probed));
        let mut results = result?;
        results.sort_by_key(|probe| probe.credential_index);
        Ok(AccessReport {
            endpoint: endpoint.to_string(),
            probed: results,
            skipped,
            excluded,
        })
    }

    /// Returns true when `credential`'s type is selected for probing.
    fn probes_type(&self, credential: &Credential) -> bool {
        match credential.credential_type.as_deref() {
            Some(kind) if !self.probe_types.is_empty() => self.probe_types.contains(kind),
            _ => true,
        }
    }

    /// Runs queued probes with bounded concurrency until done or failed.
    async fn run_probes(
        &self,
        ctx: &ProbeContext,
        endpoint: &Url,
        mut pending: VecDeque<(usize, String)>,
    ) -> Result<Vec<ProbeResult>, AccessError> {
        if ctx.cancel.is_cancelled() {
            return Err(AccessError::Cancelled);
        }
        let mut results = Vec::with_capacity(pending.len());
        let mut tasks = JoinSet::new();
        loop {
            while tasks.len() < self.max_concurrency
                && let Some((index, secret)) = pending.pop_front()
            {
                let client = self.client.clone();
                let url = endpoint.clone();
                tasks.spawn(async move { (index, probe_scopes(&client, url, &secret).await) });
            }
            let joined = tokio::select! {
                biased;
                () = ctx.cancel.cancelled() => return Err(AccessError::Cancelled),
                () = ctx.deadline_elapsed() => return Err(AccessError::Timeout),
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                return Ok(results);
            };
            let (index, outcome) = joined.map_err(|err| AccessError::Task(err.to_string()))?;
            results.push(self.classify(endpoint, index, outcome)?);
        }
    }

    /// Turns one probe outcome into a result or an error, auditing it.
    fn classify(
        &self,
        endpoint: &Url,
        credential_index: usize,
        outcome: Result<BTreeSet<String>, String>,
    ) -> Result<ProbeResult, AccessError> {
        let scopes = match outcome {
            Ok(scopes) => scopes,
            Err(reason) => {
                self.audit.record(&HarnessAuditEvent::access_probe(
                    credential_index,
                    endpoint.as_str(),
                    "error",
                    Vec::new(),
                    Some(reason.clone()),
                ));
                return Err(AccessError::Probe {
                    credential_index,
                    reason,
                });
            }
        };
        let write_scope = self.policy.first_write_scope(&scopes).map(str::to_string);
        let scopes: Vec<String> = scopes.into_iter().collect();
        let label = if write_scope.is_some() { "write_access" } else { "read_only" };
        self.audit.record(&HarnessAuditEvent::access_probe(
            credential_index,
            endpoint.as_str(),
            label,
            scopes.clone(),
            None,
        ));
        if let Some(scope) = write_scope {
            return Err(AccessError::WriteAccess {
                credential_index,
                scope,
            });
        }
        Ok(ProbeResult {
            credential_index,
            scopes,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses an API endpoint into a probe URL ending in `/`.
///
/// # Errors
///
/// Returns [`AccessError::Config`] when the endpoint is not an `http` or
/// `https` URL.
pub fn parse_endpoint(raw: &str) -> Result<Url, AccessError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AccessError::Config("api endpoint must be non-empty".to_string()));
    }
    let url = Url::parse(&format!("{trimmed}/"))
        .map_err(|err| AccessError::Config(format!("invalid api endpoint {trimmed}: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AccessError::Config(format!("unsupported api endpoint scheme: {other}"))),
    }
}

/// Issues one probe and returns the granted scopes.
///
/// A success response without a scope header grants no scopes.
async fn probe_scopes(
    client: &Client,
    url: Url,
    secret: &str,
) -> Result<BTreeSet<String>, String> {
    let mut bearer = HeaderValue::from_str(&format!("Bearer {secret}"))
        .map_err(|_| "credential secret is not a valid header value".to_string())?;
    bearer.set_sensitive(true);
    let response = client
        .get(url)
        .header(AUTHORIZATION, bearer)
        .header(ACCEPT, HeaderValue::from_static(PROVIDER_JSON_MEDIA_TYPE))
        .send()
        .await
        .map_err(|err| err.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("http status {}", status.as_u16()));
    }
    match response.headers().get(OAUTH_SCOPES_HEADER) {
        Some(value) => value
            .to_str()
            .map(parse_scopes)
            .map_err(|_| "scope header is not valid text".to_string()),
        None => Ok(BTreeSet::new()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
