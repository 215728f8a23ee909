//! Retry decision from a failure classification
//!
//! Families map their errors onto `ErrorClassification` (see `provider`); this
//! module turns a classification plus the session's attempt count into the
//! dispatcher's next move. It knows nothing about any provider.

use provider::ErrorClassification;

/// What the dispatcher does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Recoverable failure with keys left: advance and try the next key
    Rotate,
    /// Recoverable failure on the last permitted attempt: return this error
    Exhausted,
    /// Terminal failure: return this error without rotating
    Propagate,
}

/// Decide the next move.
///
/// `attempt` is 1-based; `attempts_allowed` is the pool size.
pub fn decide(
    classification: ErrorClassification,
    attempt: usize,
    attempts_allowed: usize,
) -> Decision {
    if !classification.is_recoverable() {
        Decision::Propagate
    } else if attempt < attempts_allowed {
        Decision::Rotate
    } else {
        Decision::Exhausted
    }
}
