//! Per-attempt diagnostics
//!
//! A `Diagnostics` value is owned by each wrapped target; there is no global
//! verbose switch. When enabled, every attempt produces one `AttemptRecord`
//! (key masked) handed to a `DiagnosticsSink`. Sink errors and unwinding panics
//! are logged at debug level and dropped.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use provider::ErrorClassification;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Result of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(ErrorClassification),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failed(classification) => classification.label(),
        }
    }
}

/// One attempt of a rotation session.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub session: String,
    /// 1-based attempt number within the session
    pub attempt: usize,
    pub attempts_allowed: usize,
    /// Masked key (last 4 characters)
    pub credential: String,
    pub fingerprint: String,
    pub outcome: Outcome,
    /// Whether a further attempt with another key follows
    pub rotated: bool,
    pub at: SystemTime,
}

/// Destination for attempt records.
///
/// Errors and panics from `record` are contained by `Diagnostics` and never
/// reach the call being dispatched. Builds with `panic = "abort"` cannot
/// contain a panic, so sinks should still return `Err` rather than panic.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, record: &AttemptRecord) -> Result<()>;
}

/// Emits one `tracing` event per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, record: &AttemptRecord) -> Result<()> {
        match record.outcome {
            Outcome::Success => info!(
                session = %record.session,
                attempt = record.attempt,
                attempts_allowed = record.attempts_allowed,
                key = %record.credential,
                fingerprint = %record.fingerprint,
                "call succeeded"
            ),
            Outcome::Failed(classification) => warn!(
                session = %record.session,
                attempt = record.attempt,
                attempts_allowed = record.attempts_allowed,
                key = %record.credential,
                fingerprint = %record.fingerprint,
                classification = classification.label(),
                rotated = record.rotated,
                "call failed"
            ),
        }
        Ok(())
    }
}

/// Keeps attempt records in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<AttemptRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn record(&self, record: &AttemptRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| Error::Sink("recording sink lock poisoned".into()))?
            .push(record.clone());
        Ok(())
    }
}

/// Diagnostics configuration owned by one wrapped target.
#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<Arc<dyn DiagnosticsSink>>,
}

impl Diagnostics {
    /// No records are produced.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Records go to `tracing`.
    pub fn enabled() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// `enabled()` when `verbose`, otherwise `disabled()`.
    pub fn from_flag(verbose: bool) -> Self {
        if verbose {
            Self::enabled()
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Build and deliver a record. The builder only runs when enabled.
    pub(crate) fn emit(&self, build: impl FnOnce() -> AttemptRecord) {
        let Some(sink) = &self.sink else {
            return;
        };
        let record = build();
        match panic::catch_unwind(AssertUnwindSafe(|| sink.record(&record))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(error = %e, session = %record.session, "diagnostics record dropped");
            }
            Err(_) => {
                debug!(session = %record.session, "diagnostics sink panicked, record dropped");
            }
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: Outcome) -> AttemptRecord {
        AttemptRecord {
            session: "ab12cd34".into(),
            attempt: 1,
            attempts_allowed: 2,
            credential: "...1234".into(),
            fingerprint: "deadbeef".into(),
            outcome,
            rotated: true,
            at: SystemTime::now(),
        }
    }

    struct FailingSink;

    impl DiagnosticsSink for FailingSink {
        fn record(&self, _record: &AttemptRecord) -> Result<()> {
            Err(Error::Sink("disk full".into()))
        }
    }

    #[test]
    fn disabled_never_builds_records() {
        let diagnostics = Diagnostics::disabled();
        diagnostics.emit(|| panic!("builder must not run when disabled"));
        assert!(!diagnostics.is_enabled());
    }

    #[test]
    fn recording_sink_collects_records() {
        let sink = Arc::new(RecordingSink::new());
        let diagnostics = Diagnostics::with_sink(sink.clone());
        diagnostics.emit(|| record(Outcome::Failed(ErrorClassification::RateLimited)));
        diagnostics.emit(|| record(Outcome::Success));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome.label(), "rate_limited");
        assert_eq!(records[1].outcome, Outcome::Success);
    }

    struct PanickingSink;

    impl DiagnosticsSink for PanickingSink {
        fn record(&self, _record: &AttemptRecord) -> Result<()> {
            panic!("sink exploded");
        }
    }

    #[test]
    fn sink_panics_are_contained() {
        let diagnostics = Diagnostics::with_sink(Arc::new(PanickingSink));
        diagnostics.emit(|| record(Outcome::Success));
        diagnostics.emit(|| record(Outcome::Failed(ErrorClassification::RateLimited)));
    }

    #[test]
    fn sink_errors_are_swallowed() {
        let diagnostics = Diagnostics::with_sink(Arc::new(FailingSink));
        diagnostics.emit(|| record(Outcome::Success));
    }

    #[test]
    fn tracing_sink_accepts_all_outcomes() {
        assert!(TracingSink.record(&record(Outcome::Success)).is_ok());
        assert!(
            TracingSink
                .record(&record(Outcome::Failed(ErrorClassification::Terminal)))
                .is_ok()
        );
    }

    #[test]
    fn from_flag_and_debug() {
        assert!(Diagnostics::from_flag(true).is_enabled());
        assert!(!Diagnostics::from_flag(false).is_enabled());
        assert_eq!(
            format!("{:?}", Diagnostics::enabled()),
            "Diagnostics { enabled: true }"
        );
    }
}
