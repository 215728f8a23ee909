//! Credential rotation for outbound API calls
//!
//! Wraps a target (a constructible client or a keyword-argument function) so
//! that a call failing because of its API key is retried with the next key in
//! the pool. The wrapped target keeps its call shape: same arguments, same
//! return type, same error type.
//!
//! Call flow:
//! 1. `Switcher` wraps a target once, capturing its fixed options and a
//!    `CredentialPool`
//! 2. Each call starts a `RotationSession` in the `Dispatcher`
//! 3. The call adapter binds the session's current key and invokes the target
//! 4. On failure the error is classified: RateLimited/Unauthorized advance the
//!    pool cursor and retry, Terminal returns at once
//! 5. After every key has been tried once, the last real error is returned

pub mod adapter;
pub mod classify;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod pool;
pub mod proxy;
pub mod wrap;

pub use adapter::{CallableAdapter, ClientAdapter, Invoke};
pub use classify::{Decision, decide};
pub use diagnostics::{
    AttemptRecord, Diagnostics, DiagnosticsSink, Outcome, RecordingSink, TracingSink,
};
pub use dispatch::{Dispatcher, RotationSession};
pub use error::{Error, Result};
pub use pool::{Credential, CredentialPool, Keys, Lease};
pub use proxy::{ChatProxy, CompletionsProxy, ModelsProxy};
pub use provider::{Classify, ErrorClassification, Kwargs};
pub use wrap::{
    CallableWrapper, ClientWrapper, RotatingCallable, RotatingClient, Switcher, TargetKind,
};
