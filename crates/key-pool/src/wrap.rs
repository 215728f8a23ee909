//! Wrap entry point
//!
//! `Switcher` turns a target plus a key sequence into a rotating equivalent.
//! The target's fixed options (client constructor options or fixed keyword
//! arguments) are captured once at wrap time and reused on every attempt.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use provider::{ClientCall, ClientFactory, DirectCall, FnCall, Kwargs};
use tracing::debug;

use crate::adapter::{CallableAdapter, ClientAdapter};
use crate::diagnostics::Diagnostics;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::pool::{CredentialPool, Keys};

/// Shape of a wrapped target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Constructible client; the key is a constructor parameter
    Client,
    /// Function taking keyword arguments; the key is one of them
    Callable,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Client => "client",
            TargetKind::Callable => "callable",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(TargetKind::Client),
            "callable" | "function" => Ok(TargetKind::Callable),
            other => Err(Error::Configuration(format!(
                "unsupported target: {other:?} (expected \"client\" or \"callable\")"
            ))),
        }
    }
}

/// Entry point for wrapping targets.
///
/// Holds the diagnostics every wrapper starts with; individual wrappers may
/// override it.
#[derive(Debug, Clone, Default)]
pub struct Switcher {
    diagnostics: Diagnostics,
}

impl Switcher {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    /// Wrap a constructible client type.
    pub fn client<F: ClientFactory>(&self, factory: F) -> ClientWrapper<F> {
        ClientWrapper {
            factory,
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Wrap a keyword-argument function.
    pub fn callable<C: DirectCall>(&self, target: C) -> CallableWrapper<C> {
        CallableWrapper {
            target,
            diagnostics: self.diagnostics.clone(),
        }
    }
}

fn dispatcher(keys: impl Into<Keys>, diagnostics: Diagnostics, kind: TargetKind) -> Result<Dispatcher> {
    let pool = CredentialPool::new(keys)?;
    debug!(
        target_kind = %kind,
        keys = pool.size(),
        diagnostics = diagnostics.is_enabled(),
        "target wrapped"
    );
    Ok(Dispatcher::new(Arc::new(pool), diagnostics))
}

/// Pending wrap of a constructible client.
pub struct ClientWrapper<F> {
    factory: F,
    diagnostics: Diagnostics,
}

impl<F: ClientFactory> ClientWrapper<F> {
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Capture `options` and the key sequence. Fails on an empty sequence.
    pub fn build(self, keys: impl Into<Keys>, options: F::Options) -> Result<RotatingClient<F>> {
        Ok(RotatingClient {
            dispatcher: dispatcher(keys, self.diagnostics, TargetKind::Client)?,
            adapter: ClientAdapter::new(self.factory, options),
        })
    }
}

/// Pending wrap of a keyword-argument function.
pub struct CallableWrapper<C> {
    target: C,
    diagnostics: Diagnostics,
}

impl<C: DirectCall> CallableWrapper<C> {
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Capture the fixed keyword arguments and the key sequence. Fails on an
    /// empty sequence.
    pub fn build(self, keys: impl Into<Keys>, fixed: Kwargs) -> Result<RotatingCallable<C>> {
        Ok(RotatingCallable {
            dispatcher: dispatcher(keys, self.diagnostics, TargetKind::Callable)?,
            adapter: CallableAdapter::new(self.target, fixed),
        })
    }
}

/// A client whose terminal operations rotate keys.
///
/// Every call constructs a fresh client with the attempt's key and the options
/// captured at wrap time.
pub struct RotatingClient<F: ClientFactory> {
    adapter: ClientAdapter<F>,
    dispatcher: Dispatcher,
}

impl<F: ClientFactory> RotatingClient<F> {
    /// Run a terminal operation with rotation.
    pub async fn call<Op>(&self, op: &Op) -> std::result::Result<Op::Output, F::Error>
    where
        Op: ClientCall<F::Client, Error = F::Error>,
    {
        self.dispatcher.run(&self.adapter, op).await
    }

    /// Run a closure against the constructed client with rotation.
    pub async fn call_with<Func, Fut, T>(&self, f: Func) -> std::result::Result<T, F::Error>
    where
        Func: Fn(F::Client) -> Fut + Send + Sync,
        Fut: Future<Output = std::result::Result<T, F::Error>> + Send + 'static,
        T: Send,
    {
        self.call(&FnCall(f)).await
    }

    pub fn pool(&self) -> &CredentialPool {
        self.dispatcher.pool()
    }

    pub fn options(&self) -> &F::Options {
        self.adapter.options()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.dispatcher.diagnostics()
    }
}

impl<F: ClientFactory> fmt::Debug for RotatingClient<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingClient")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// A keyword-argument function that rotates keys.
pub struct RotatingCallable<C: DirectCall> {
    adapter: CallableAdapter<C>,
    dispatcher: Dispatcher,
}

impl<C: DirectCall> RotatingCallable<C> {
    /// Call with per-call keyword arguments. They override the fixed ones; the
    /// credential parameter is always supplied by the pool.
    pub async fn call(&self, kwargs: Kwargs) -> std::result::Result<C::Output, C::Error> {
        self.dispatcher.run(&self.adapter, &kwargs).await
    }

    pub fn pool(&self) -> &CredentialPool {
        self.dispatcher.pool()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.dispatcher.diagnostics()
    }
}

impl<C: DirectCall> fmt::Debug for RotatingCallable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingCallable")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
