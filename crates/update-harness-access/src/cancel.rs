// crates/update-harness-access/src/cancel.rs
// ============================================================================
// Module: Probe Cancellation
// Description: Cancellation signal and deadline for access checks.
// Purpose: Let the orchestrator abort outstanding probes.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! A [`CancelHandle`] and [`CancelToken`] share a `tokio::sync::watch`
//! channel. The handle flips the flag once; every token clone observes it.
//! [`ProbeContext`] bundles a token with an optional overall deadline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Creates a connected cancel handle and token.
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (sender, receiver) = watch::channel(false);
    (
        CancelHandle {
            sender: Arc::new(sender),
        },
        CancelToken {
            receiver,
        },
    )
}

/// Sending side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    /// Shared flag sender.
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Signals cancellation to every connected token.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Receiving side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    /// Shared flag receiver.
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    /// Returns a token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self {
            receiver,
        }
    }

    /// Returns true once cancellation has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes when cancellation is signalled.
    ///
    /// Never completes if every handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// SECTION: Probe Context
// ============================================================================

/// Cancellation and deadline for one access check.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    /// Cancellation signal.
    pub cancel: CancelToken,
    /// Optional instant by which every probe must finish.
    pub deadline: Option<Instant>,
}

impl ProbeContext {
    /// Creates a context with no deadline.
    #[must_use]
    pub const fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Creates a context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::new(CancelToken::never())
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Completes when the deadline passes; never completes without one.
    pub(crate) async fn deadline_elapsed(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}
