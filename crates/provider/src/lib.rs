//! Target-family abstraction for credential rotation
//!
//! Defines the seams the rotation core drives without knowing any provider:
//! - `Classify` maps a family's real error taxonomy onto `ErrorClassification`
//! - `ClientFactory` + `ClientCall` describe a constructible client whose
//!   terminal operations run against a freshly built instance
//! - `DirectCall` describes a function invoked with keyword arguments, one of
//!   which carries the credential
//!
//! Two families ship with the crate: the OpenAI-compatible client
//! (`openai::OpenAi`) and the direct completion function
//! (`completion::Completion`).

pub mod completion;
pub mod error;
mod http;
pub mod openai;

pub use completion::Completion;
pub use error::{ApiError, classify_error_chain};
pub use openai::{ClientOptions, OpenAi, OpenAiClient};

use std::future::Future;
use std::pin::Pin;

/// Boxed `Send` future used at every dyn-compatible seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Keyword arguments for a direct callable.
pub type Kwargs = serde_json::Map<String, serde_json::Value>;

/// Classification of a failed call, deciding whether another credential is tried.
///
/// - RateLimited and Unauthorized are attributable to the credential: rotate
/// - Terminal is not: propagate without touching the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClassification {
    /// Quota or rate exhaustion on this credential (429-equivalent)
    RateLimited,
    /// The provider rejected the credential itself (401/403-equivalent)
    Unauthorized,
    /// Anything else: malformed request, transport failure, provider 5xx
    Terminal,
}

impl ErrorClassification {
    /// Whether the failure should consume a rotation and retry.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorClassification::Terminal)
    }

    /// Label for logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            ErrorClassification::RateLimited => "rate_limited",
            ErrorClassification::Unauthorized => "unauthorized",
            ErrorClassification::Terminal => "terminal",
        }
    }
}

/// Structural classification of an error raised by a target.
///
/// Implementations inspect status codes, error codes or type tags. Message
/// text is never matched.
pub trait Classify {
    fn classify(&self) -> ErrorClassification;
}

/// Classify an HTTP status code.
///
/// 429 is RateLimited, 401/403 are Unauthorized. Every other status, including
/// 408 and 5xx, is Terminal: a different key would not fix it.
pub fn classify_status(status: u16) -> ErrorClassification {
    match status {
        429 => ErrorClassification::RateLimited,
        401 | 403 => ErrorClassification::Unauthorized,
        _ => ErrorClassification::Terminal,
    }
}

/// Classify a provider error code or type tag.
///
/// Returns `None` for codes that say nothing about the credential, so the
/// caller can fall back to the status.
pub fn classify_code(code: &str) -> Option<ErrorClassification> {
    match code {
        "rate_limit_exceeded" | "insufficient_quota" | "rate_limit_error" => {
            Some(ErrorClassification::RateLimited)
        }
        "invalid_api_key" | "authentication_error" | "permission_denied"
        | "permission_error" => Some(ErrorClassification::Unauthorized),
        _ => None,
    }
}

/// A constructible client type.
///
/// `construct` is called once per attempt with the attempt's credential and the
/// options captured at wrap time. Construction should be cheap; share
/// connection pools through the factory.
pub trait ClientFactory: Send + Sync {
    type Client: Send + 'static;
    type Options: Send + Sync;
    type Error: Classify + std::error::Error + Send + Sync + 'static;

    fn construct(
        &self,
        credential: &str,
        options: &Self::Options,
    ) -> Result<Self::Client, Self::Error>;
}

/// A terminal operation run against a constructed client.
///
/// The client is moved in, so the returned future borrows only the operation.
pub trait ClientCall<C>: Send + Sync {
    type Output: Send;
    type Error: Send;

    fn call(&self, client: C) -> BoxFuture<'_, Result<Self::Output, Self::Error>>;
}

/// Adapts a closure `Fn(Client) -> Future` into a `ClientCall`.
///
/// This is the open-ended forwarding path for client APIs without an
/// enumerated proxy.
pub struct FnCall<F>(pub F);

impl<C, F, Fut, T, E> ClientCall<C> for FnCall<F>
where
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send,
    E: Send,
{
    type Output = T;
    type Error = E;

    fn call(&self, client: C) -> BoxFuture<'_, Result<T, E>> {
        Box::pin((self.0)(client))
    }
}

/// A function invoked with keyword arguments.
///
/// The credential is merged into the arguments under `CREDENTIAL_PARAM`
/// before every call.
pub trait DirectCall: Send + Sync {
    /// Keyword the credential is injected under.
    const CREDENTIAL_PARAM: &'static str;

    type Output: Send;
    type Error: Classify + std::error::Error + Send + Sync + 'static;

    fn call(&self, kwargs: Kwargs) -> BoxFuture<'_, Result<Self::Output, Self::Error>>;
}
