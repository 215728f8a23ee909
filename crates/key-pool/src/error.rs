//! Error types for the rotation layer
//!
//! Provider failures never appear here: the dispatcher returns the target's
//! own error unchanged. This enum only covers wrap-time problems and sink
//! failures, which are swallowed before reaching a caller.

/// Errors raised by the rotation layer itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("diagnostics sink failed: {0}")]
    Sink(String),
}

/// Result alias for rotation-layer operations.
pub type Result<T> = std::result::Result<T, Error>;
