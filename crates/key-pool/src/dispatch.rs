//! Rotation dispatcher
//!
//! Runs one logical call as a `RotationSession`: bind the key at the session's
//! slot, invoke, and on a recoverable failure move the shared cursor and try
//! the next slot. Each session makes at most `pool.size()` attempts and walks
//! `start, start + 1, ...` from the cursor position it observed when it began.
//! Terminal failures return at once without touching the cursor. When every
//! key has failed, the error from the final attempt is returned as-is.

use std::sync::Arc;
use std::time::SystemTime;

use provider::{Classify, ErrorClassification};
use tracing::{Span, debug, instrument, warn};
use uuid::Uuid;

use crate::adapter::Invoke;
use crate::classify::{Decision, decide};
use crate::diagnostics::{AttemptRecord, Diagnostics, Outcome};
use crate::pool::{CredentialPool, Lease};

/// State of one logical call. Lives only for the duration of `Dispatcher::run`.
#[derive(Debug, Clone)]
pub struct RotationSession {
    id: String,
    start: usize,
    attempts: usize,
    attempts_allowed: usize,
    last: Option<ErrorClassification>,
}

impl RotationSession {
    fn begin(pool: &CredentialPool) -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        Self {
            id,
            start: pool.cursor(),
            attempts: 0,
            attempts_allowed: pool.size(),
            last: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cursor position observed when the session began.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn attempts_allowed(&self) -> usize {
        self.attempts_allowed
    }

    /// Classification of the most recent failed attempt.
    pub fn last_classification(&self) -> Option<ErrorClassification> {
        self.last
    }

    fn next_lease(&mut self, pool: &CredentialPool) -> Lease {
        let lease = pool.lease_at(self.start + self.attempts);
        self.attempts += 1;
        lease
    }

    fn record(&self, lease: &Lease, outcome: Outcome, rotated: bool) -> AttemptRecord {
        AttemptRecord {
            session: self.id.clone(),
            attempt: self.attempts,
            attempts_allowed: self.attempts_allowed,
            credential: lease.credential.masked(),
            fingerprint: lease.credential.fingerprint(),
            outcome,
            rotated,
            at: SystemTime::now(),
        }
    }
}

/// Drives rotation sessions against one pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: Arc<CredentialPool>,
    diagnostics: Diagnostics,
}

impl Dispatcher {
    pub fn new(pool: Arc<CredentialPool>, diagnostics: Diagnostics) -> Self {
        Self { pool, diagnostics }
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run one logical call through `adapter`, rotating keys on recoverable
    /// failures. Returns the target's own output or error.
    #[instrument(
        name = "rotation",
        skip_all,
        fields(session = tracing::field::Empty, pool_size = self.pool.size())
    )]
    pub async fn run<A, R>(&self, adapter: &A, request: &R) -> Result<A::Output, A::Error>
    where
        A: Invoke<R>,
        R: ?Sized + Sync,
    {
        let mut session = RotationSession::begin(&self.pool);
        Span::current().record("session", session.id());

        loop {
            let lease = session.next_lease(&self.pool);
            let err = match adapter.invoke(lease.credential.clone(), request).await {
                Ok(output) => {
                    record_attempt(Outcome::Success);
                    self.diagnostics
                        .emit(|| session.record(&lease, Outcome::Success, false));
                    if session.attempts > 1 {
                        debug!(
                            attempts = session.attempts,
                            key = %lease.credential.masked(),
                            "call succeeded after rotation"
                        );
                    }
                    return Ok(output);
                }
                Err(err) => err,
            };

            let classification = err.classify();
            session.last = Some(classification);
            let decision = decide(classification, session.attempts, session.attempts_allowed);
            let outcome = Outcome::Failed(classification);
            record_attempt(outcome);
            self.diagnostics.emit(|| {
                session.record(&lease, outcome, decision == Decision::Rotate)
            });

            match decision {
                Decision::Propagate => {
                    debug!(
                        attempt = session.attempts,
                        error = %err,
                        "terminal failure, not rotating"
                    );
                    return Err(err);
                }
                Decision::Rotate => {
                    let next = self.pool.advance_from(lease.slot);
                    record_rotation();
                    debug!(
                        attempt = session.attempts,
                        classification = classification.label(),
                        from = %lease.credential.masked(),
                        to = %next.masked(),
                        "rotating to next key"
                    );
                }
                Decision::Exhausted => {
                    self.pool.advance_from(lease.slot);
                    record_exhausted();
                    warn!(
                        attempts = session.attempts,
                        classification = classification.label(),
                        error = %err,
                        "all keys failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}

fn record_attempt(outcome: Outcome) {
    metrics::counter!("keyswitch_attempts_total", "outcome" => outcome.label()).increment(1);
}

fn record_rotation() {
    metrics::counter!("keyswitch_rotations_total").increment(1);
}

fn record_exhausted() {
    metrics::counter!("keyswitch_exhausted_total").increment(1);
}
