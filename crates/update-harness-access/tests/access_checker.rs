// crates/update-harness-access/tests/access_checker.rs
// ============================================================================
// Module: Access Checker Tests
// Description: Probe behavior against local provider stubs.
// Purpose: Verify scope classification, endpoint selection, and failure modes.
// ============================================================================

//! ## Overview
//! Each test starts a `tiny_http` server that answers probes with a chosen
//! status and `X-OAuth-Scopes` header, then runs the checker against it.
//! Failure modes (non-success status, cancellation, deadline) must never be
//! reported as "no write access".

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;
use update_harness_access::AccessCheckConfig;
use update_harness_access::AccessChecker;
use update_harness_access::AccessError;
use update_harness_access::ProbeContext;
use update_harness_access::cancel_pair;
use update_harness_core::Credential;
use update_harness_core::HarnessAuditEvent;
use update_harness_core::Job;
use update_harness_core::MemoryAuditSink;
use update_harness_core::Source;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Request details observed by a stub server.
#[derive(Debug)]
struct SeenRequest {
    /// Request path.
    path: String,
    /// Authorization header value.
    authorization: Option<String>,
    /// Accept header value.
    accept: Option<String>,
}

/// Stub reply: status code and optional scope header.
type Reply = (u16, Option<&'static str>);

/// Starts a provider stub; `respond` maps the authorization header to a reply.
fn scope_server<F>(respond: F) -> (String, mpsc::Receiver<SeenRequest>)
where
    F: Fn(&str) -> Reply + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for request in server.incoming_requests() {
            let header = |name: &'static str| {
                request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv(name))
                    .map(|header| header.value.as_str().to_string())
            };
            let seen = SeenRequest {
                path: request.url().to_string(),
                authorization: header("Authorization"),
                accept: header("Accept"),
            };
            let (status, scopes) = respond(seen.authorization.as_deref().unwrap_or_default());
            let _ = tx.send(seen);
            let mut response = Response::from_string("{}").with_status_code(StatusCode(status));
            if let Some(scopes) = scopes {
                response = response.with_header(
                    Header::from_bytes(&b"X-OAuth-Scopes"[..], scopes.as_bytes()).unwrap(),
                );
            }
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}"), rx)
}

/// Starts a stub that accepts requests and never answers them.
fn hanging_server() -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || {
        let mut held = Vec::new();
        for request in server.incoming_requests() {
            held.push(request);
        }
    });
    format!("http://{addr}")
}

fn checker_for(endpoint: &str) -> AccessChecker {
    AccessChecker::new(AccessCheckConfig {
        api_endpoint: endpoint.to_string(),
        timeout_ms: 5_000,
        ..AccessCheckConfig::default()
    })
    .unwrap()
}

fn job_with_endpoint(endpoint: &str) -> Job {
    Job {
        source: Source {
            api_endpoint: Some(endpoint.to_string()),
            ..Source::default()
        },
        ..Job::default()
    }
}

// ============================================================================
// SECTION: Scope Classification
// ============================================================================

#[tokio::test]
async fn write_scope_is_rejected() {
    let (url, rx) = scope_server(|_| (200, Some("repo, write:packages")));
    let checker = checker_for(&url);

    let err = checker
        .check_access(&ProbeContext::background(), None, &[Credential::from_token("ghp_fake")])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AccessError::WriteAccess {
            credential_index: 0,
            ..
        }
    ));
    let seen = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(seen.path, "/");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer ghp_fake"));
    assert_eq!(seen.accept.as_deref(), Some("application/vnd.github+json"));
}

#[tokio::test]
async fn read_only_scopes_are_allowed() {
    let (url, _rx) = scope_server(|_| (200, Some("repo:status, read:packages")));
    let checker = checker_for(&url);

    let report = checker
        .check_access(&ProbeContext::background(), None, &[Credential::from_token("ghp_fake")])
        .await
        .unwrap();

    assert_eq!(report.probed.len(), 1);
    assert_eq!(report.probed[0].scopes, vec!["read:packages", "repo:status"]);
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn missing_scope_header_grants_no_scopes() {
    let (url, _rx) = scope_server(|_| (200, None));
    let checker = checker_for(&url);

    let report = checker
        .check_access(&ProbeContext::background(), None, &[Credential::from_token("github_pat")])
        .await
        .unwrap();

    assert!(report.probed[0].scopes.is_empty());
}

#[tokio::test]
async fn configured_extra_write_scope_is_rejected() {
    let (url, _rx) = scope_server(|_| (200, Some("read:org, codespace")));
    let checker = AccessChecker::new(AccessCheckConfig {
        api_endpoint: url,
        extra_write_scopes: vec!["codespace".to_string()],
        ..AccessCheckConfig::default()
    })
    .unwrap();

    let err = checker
        .check_access(&ProbeContext::background(), None, &[Credential::from_token("ghp_fake")])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AccessError::WriteAccess {
            credential_index: 0,
            scope: "codespace".to_string(),
        }
    );
}

#[tokio::test]
async fn any_write_credential_fails_the_set() {
    let (url, _rx) = scope_server(|authorization| {
        if authorization.ends_with("writer") { (200, Some("repo")) } else { (200, Some("read:org")) }
    });
    let checker = checker_for(&url);
    let credentials = [
        Credential::from_token("reader"),
        Credential::from_token("writer"),
        Credential::from_token("reader-two"),
    ];

    let err = checker
        .check_access(&ProbeContext::background(), None, &credentials)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AccessError::WriteAccess {
            credential_index: 1,
            scope: "repo".to_string(),
        }
    );
}

#[tokio::test]
async fn concurrency_limit_of_one_probes_every_credential() {
    let (url, rx) = scope_server(|_| (200, Some("read:org")));
    let checker = AccessChecker::new(AccessCheckConfig {
        api_endpoint: url,
        max_concurrency: 1,
        ..AccessCheckConfig::default()
    })
    .unwrap();
    let credentials: Vec<Credential> =
        (0 .. 4).map(|index| Credential::from_token(format!("token-{index}"))).collect();

    let report = checker
        .check_access(&ProbeContext::background(), None, &credentials)
        .await
        .unwrap();

    let indices: Vec<usize> = report.probed.iter().map(|probe| probe.credential_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(rx.try_iter().count(), 4);
}

// ============================================================================
// SECTION: Credential Secrets
// ============================================================================

#[tokio::test]
async fn password_and_legacy_pass_are_probed() {
    let (url, rx) = scope_server(|_| (200, Some("read:org")));
    let checker = AccessChecker::new(AccessCheckConfig {
        api_endpoint: url,
        max_concurrency: 1,
        ..AccessCheckConfig::default()
    })
    .unwrap();
    let credentials = [
        Credential {
            password: Some("pw-secret".to_string()),
            ..Credential::default()
        },
        Credential::new().with_extra("pass", "legacy-secret"),
    ];

    checker.check_access(&ProbeContext::background(), None, &credentials).await.unwrap();

    let mut seen: Vec<String> = rx.try_iter().filter_map(|seen| seen.authorization).collect();
    seen.sort();
    assert_eq!(seen, vec!["Bearer legacy-secret", "Bearer pw-secret"]);
}

#[tokio::test]
async fn credentials_without_secret_are_skipped() {
    let (url, rx) = scope_server(|_| (200, Some("read:org")));
    let checker = checker_for(&url);
    let credentials = [
        Credential {
            host: Some("registry.example.com".to_string()),
            username: Some("user".to_string()),
            ..Credential::default()
        },
        Credential::from_token("ghp_fake"),
    ];

    let report = checker
        .check_access(&ProbeContext::background(), None, &credentials)
        .await
        .unwrap();

    assert_eq!(report.skipped, vec![0]);
    assert_eq!(report.probed.len(), 1);
    assert_eq!(report.probed[0].credential_index, 1);
    assert_eq!(rx.try_iter().count(), 1);
}

#[tokio::test]
async fn credential_types_outside_probe_types_are_excluded() {
    let (url, rx) = scope_server(|auth| {
        if auth == "Bearer registry-password" { (401, None) } else { (200, Some("read:org")) }
    });
    let checker = AccessChecker::new(AccessCheckConfig {
        api_endpoint: url,
        probe_types: vec!["git_source".to_string()],
        ..AccessCheckConfig::default()
    })
    .unwrap();
    let credentials = [
        Credential {
            credential_type: Some("npm_registry".to_string()),
            password: Some("registry-password".to_string()),
            ..Credential::default()
        },
        Credential {
            credential_type: Some("git_source".to_string()),
            ..Credential::from_token("ghp_source")
        },
        Credential::from_token("ghp_untyped"),
    ];

    let report = checker
        .check_access(&ProbeContext::background(), None, &credentials)
        .await
        .unwrap();

    assert_eq!(report.excluded, vec![0]);
    assert!(report.skipped.is_empty());
    let probed: Vec<usize> = report.probed.iter().map(|probe| probe.credential_index).collect();
    assert_eq!(probed, vec![1, 2]);
    let seen: Vec<String> = rx.try_iter().filter_map(|request| request.authorization).collect();
    assert_eq!(seen.len(), 2);
    assert!(!seen.iter().any(|auth| auth.contains("registry-password")));
}

#[tokio::test]
async fn registry_credentials_are_probed_without_probe_types() {
    let (url, _rx) = scope_server(|auth| {
        if auth == "Bearer registry-password" { (401, None) } else { (200, Some("read:org")) }
    });
    let checker = checker_for(&url);
    let credentials = [Credential {
        credential_type: Some("npm_registry".to_string()),
        password: Some("registry-password".to_string()),
        ..Credential::default()
    }];

    let err = checker
        .check_access(&ProbeContext::background(), None, &credentials)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AccessError::Probe {
            credential_index: 0,
            reason: "http status 401".to_string(),
        }
    );
}

// ============================================================================
// SECTION: Endpoint Selection
// ============================================================================

#[tokio::test]
async fn job_endpoint_overrides_default() {
    let (url, rx) = scope_server(|_| (200, Some("read:org")));
    let checker = checker_for("http://127.0.0.1:9");
    let job = job_with_endpoint(&format!("{url}/api/v3/"));

    let report = checker
        .check_access(&ProbeContext::background(), Some(&job), &[Credential::from_token("t")])
        .await
        .unwrap();

    assert_eq!(report.endpoint, format!("{url}/api/v3/"));
    assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap().path, "/api/v3/");
}

#[tokio::test]
async fn blank_job_endpoint_uses_default() {
    let (url, _rx) = scope_server(|_| (200, Some("read:org")));
    let checker = checker_for(&url);
    let job = job_with_endpoint("  ");

    let report = checker
        .check_access(&ProbeContext::background(), Some(&job), &[Credential::from_token("t")])
        .await
        .unwrap();

    assert_eq!(report.endpoint, format!("{url}/"));
}

#[tokio::test]
async fn invalid_job_endpoint_is_config_error() {
    let checker = checker_for("http://127.0.0.1:9");
    let job = job_with_endpoint("not a url");

    let err = checker
        .check_access(&ProbeContext::background(), Some(&job), &[Credential::from_token("t")])
        .await
        .unwrap_err();

    assert!(matches!(err, AccessError::Config(_)));
}

// ============================================================================
// SECTION: Failure Modes
// ============================================================================

#[tokio::test]
async fn non_success_status_is_probe_error() {
    let (url, _rx) = scope_server(|_| (401, Some("")));
    let checker = checker_for(&url);

    let err = checker
        .check_access(&ProbeContext::background(), None, &[Credential::from_token("bad")])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AccessError::Probe {
            credential_index: 0,
            reason: "http status 401".to_string(),
        }
    );
}

#[tokio::test]
async fn unreachable_endpoint_is_probe_error() {
    let checker = checker_for("http://127.0.0.1:9");

    let err = checker
        .check_access(&ProbeContext::background(), None, &[Credential::from_token("t")])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AccessError::Probe {
            credential_index: 0,
            ..
        }
    ));
}

#[tokio::test]
async fn cancelled_before_probing_is_cancelled() {
    let (url, rx) = scope_server(|_| (200, Some("read:org")));
    let checker = checker_for(&url);
    let (handle, token) = cancel_pair();
    handle.cancel();

    let err = checker
        .check_access(&ProbeContext::new(token), None, &[Credential::from_token("t")])
        .await
        .unwrap_err();

    assert_eq!(err, AccessError::Cancelled);
    assert_eq!(rx.try_iter().count(), 0);
}

#[tokio::test]
async fn cancelled_during_probe_is_cancelled() {
    let url = hanging_server();
    let checker = checker_for(&url);
    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let err = checker
        .check_access(&ProbeContext::new(token), None, &[Credential::from_token("t")])
        .await
        .unwrap_err();

    assert_eq!(err, AccessError::Cancelled);
}

#[tokio::test]
async fn deadline_elapsed_is_timeout() {
    let url = hanging_server();
    let checker = checker_for(&url);
    let ctx = ProbeContext::background().with_timeout(Duration::from_millis(50));

    let err = checker
        .check_access(&ctx, None, &[Credential::from_token("t")])
        .await
        .unwrap_err();

    assert_eq!(err, AccessError::Timeout);
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[tokio::test]
async fn audit_events_name_outcomes_without_secrets() {
    let (url, _rx) = scope_server(|_| (200, Some("repo")));
    let sink = Arc::new(MemoryAuditSink::new());
    let checker = checker_for(&url).with_audit(sink.clone());

    let _ = checker
        .check_access(
            &ProbeContext::background(),
            None,
            &[Credential::new(), Credential::from_token("ghp_super_secret")],
        )
        .await;

    let events = sink.events();
    let labels: Vec<&str> = events.iter().map(HarnessAuditEvent::label).collect();
    assert_eq!(labels, vec!["access_probe", "access_probe", "access_check"]);
    assert!(matches!(
        &events[2],
        HarnessAuditEvent::AccessCheck {
            outcome: "write_access",
            probed: 1,
            ..
        }
    ));
    for event in &events {
        let payload = serde_json::to_string(event).unwrap();
        assert!(!payload.contains("ghp_super_secret"));
    }
}
