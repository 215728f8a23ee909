//! Call adapters: bind a credential into a target and run one attempt
//!
//! `Invoke` is the one contract the dispatcher drives. `ClientAdapter` covers
//! constructible clients (rebuild with the key, then run the terminal
//! operation); `CallableAdapter` covers keyword-argument functions (merge the
//! key into the arguments, then call). Both return the target's result and
//! error untouched.

use provider::{BoxFuture, Classify, ClientCall, ClientFactory, DirectCall, Kwargs};
use serde_json::Value;
use tracing::debug;

use crate::pool::Credential;

/// One invocation attempt with a given credential.
pub trait Invoke<R: ?Sized>: Send + Sync {
    type Output: Send;
    type Error: Classify + std::fmt::Display + Send;

    fn invoke<'a>(
        &'a self,
        credential: Credential,
        request: &'a R,
    ) -> BoxFuture<'a, Result<Self::Output, Self::Error>>;
}

/// Constructible-client target: factory plus the options captured at wrap time.
pub struct ClientAdapter<F: ClientFactory> {
    factory: F,
    options: F::Options,
}

impl<F: ClientFactory> ClientAdapter<F> {
    pub fn new(factory: F, options: F::Options) -> Self {
        Self { factory, options }
    }

    pub fn options(&self) -> &F::Options {
        &self.options
    }

    /// Build a client bound to `credential` with the captured options.
    pub fn construct(&self, credential: &Credential) -> Result<F::Client, F::Error> {
        self.factory.construct(credential.expose(), &self.options)
    }
}

impl<F, Op> Invoke<Op> for ClientAdapter<F>
where
    F: ClientFactory,
    Op: ClientCall<F::Client, Error = F::Error>,
{
    type Output = Op::Output;
    type Error = F::Error;

    fn invoke<'a>(
        &'a self,
        credential: Credential,
        op: &'a Op,
    ) -> BoxFuture<'a, Result<Op::Output, F::Error>> {
        Box::pin(async move {
            let client = self.construct(&credential)?;
            op.call(client).await
        })
    }
}

/// Direct-callable target: function plus the keyword arguments fixed at wrap time.
pub struct CallableAdapter<C: DirectCall> {
    target: C,
    fixed: Kwargs,
}

impl<C: DirectCall> CallableAdapter<C> {
    pub fn new(target: C, fixed: Kwargs) -> Self {
        Self { target, fixed }
    }

    pub fn fixed(&self) -> &Kwargs {
        &self.fixed
    }

    /// Merge fixed arguments, then per-call arguments, then the credential.
    ///
    /// Per-call arguments override fixed ones; the credential overrides both.
    pub fn bind(&self, credential: &Credential, kwargs: &Kwargs) -> Kwargs {
        let mut merged = self.fixed.clone();
        for (key, value) in kwargs {
            merged.insert(key.clone(), value.clone());
        }
        if merged.contains_key(C::CREDENTIAL_PARAM) {
            debug!(
                param = C::CREDENTIAL_PARAM,
                "caller-supplied credential argument replaced by pool key"
            );
        }
        merged.insert(
            C::CREDENTIAL_PARAM.to_string(),
            Value::String(credential.expose().to_string()),
        );
        merged
    }
}

impl<C: DirectCall> Invoke<Kwargs> for CallableAdapter<C> {
    type Output = C::Output;
    type Error = C::Error;

    fn invoke<'a>(
        &'a self,
        credential: Credential,
        kwargs: &'a Kwargs,
    ) -> BoxFuture<'a, Result<C::Output, C::Error>> {
        self.target.call(self.bind(&credential, kwargs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider::{ApiError, ErrorClassification, FnCall};
    use serde_json::json;

    /// Factory whose "client" is the key it was built with.
    struct EchoFactory;

    impl ClientFactory for EchoFactory {
        type Client = String;
        type Options = String;
        type Error = ApiError;

        fn construct(&self, credential: &str, options: &String) -> Result<String, ApiError> {
            if credential.is_empty() {
                return Err(ApiError::new("empty key").with_code("invalid_api_key"));
            }
            Ok(format!("{options}|{credential}"))
        }
    }

    /// Callable that returns its arguments.
    struct EchoCall;

    impl DirectCall for EchoCall {
        const CREDENTIAL_PARAM: &'static str = "token";

        type Output = Kwargs;
        type Error = ApiError;

        fn call(&self, kwargs: Kwargs) -> BoxFuture<'_, Result<Kwargs, ApiError>> {
            Box::pin(async move { Ok(kwargs) })
        }
    }

    fn kwargs(value: Value) -> Kwargs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn client_adapter_constructs_per_attempt_with_fixed_options() {
        let adapter = ClientAdapter::new(EchoFactory, "https://example.test".to_string());
        let op = FnCall(|client: String| async move { Ok::<_, ApiError>(client) });

        let first = adapter.invoke(Credential::new("sk-a"), &op).await.unwrap();
        let second = adapter.invoke(Credential::new("sk-b"), &op).await.unwrap();
        assert_eq!(first, "https://example.test|sk-a");
        assert_eq!(second, "https://example.test|sk-b");
    }

    #[tokio::test]
    async fn client_adapter_surfaces_construction_errors() {
        let adapter = ClientAdapter::new(EchoFactory, String::new());
        let op = FnCall(|client: String| async move { Ok::<_, ApiError>(client) });
        let err = adapter.invoke(Credential::new(""), &op).await.unwrap_err();
        assert_eq!(err.classify(), ErrorClassification::Unauthorized);
    }

    #[test]
    fn bind_merges_in_precedence_order() {
        let adapter = CallableAdapter::new(
            EchoCall,
            kwargs(json!({"base_url": "http://fixed", "model": "fixed-model"})),
        );
        let merged = adapter.bind(
            &Credential::new("sk-pool"),
            &kwargs(json!({"model": "call-model", "token": "sk-caller"})),
        );
        assert_eq!(merged["base_url"], "http://fixed");
        assert_eq!(merged["model"], "call-model");
        assert_eq!(merged["token"], "sk-pool");
    }

    #[tokio::test]
    async fn callable_adapter_injects_credential_under_family_param() {
        let adapter = CallableAdapter::new(EchoCall, Kwargs::new());
        let out = adapter
            .invoke(Credential::new("sk-a"), &kwargs(json!({"messages": []})))
            .await
            .unwrap();
        assert_eq!(out["token"], "sk-a");
        assert!(out.contains_key("messages"));
        assert!(adapter.fixed().is_empty());
    }
}
