//! Direct completion function family (direct callable shape)
//!
//! `Completion` is called with keyword arguments the way a completion
//! function is: `model`, `messages`, optional `base_url`/`timeout_secs`, and any
//! body parameters. The credential arrives as `api_key`.

use std::time::Duration;

use common::Secret;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{join_url, send_json, validate_base_url};
use crate::openai::DEFAULT_BASE_URL;
use crate::{BoxFuture, DirectCall, Kwargs};

/// OpenAI-compatible `chat/completions` as a keyword-argument function.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    http: reqwest::Client,
}

impl Completion {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl DirectCall for Completion {
    const CREDENTIAL_PARAM: &'static str = "api_key";

    type Output = Value;
    type Error = ApiError;

    fn call(&self, kwargs: Kwargs) -> BoxFuture<'_, Result<Value, ApiError>> {
        Box::pin(async move {
            let request = CompletionRequest::from_kwargs(kwargs)?;
            let mut builder = self
                .http
                .post(join_url(&request.base_url, "chat/completions"))
                .bearer_auth(request.api_key.expose())
                .json(&request.body);
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            send_json(builder).await
        })
    }
}

/// Keyword arguments split into transport settings and the JSON body.
struct CompletionRequest {
    base_url: String,
    api_key: Secret<String>,
    timeout: Option<Duration>,
    body: Kwargs,
}

impl CompletionRequest {
    fn from_kwargs(mut kwargs: Kwargs) -> Result<Self, ApiError> {
        let api_key = match kwargs.remove(Completion::CREDENTIAL_PARAM) {
            Some(Value::String(key)) if !key.trim().is_empty() => Secret::new(key),
            _ => {
                return Err(ApiError::new("api_key is required").with_code("invalid_api_key"));
            }
        };

        let base_url = match kwargs.remove("base_url") {
            Some(Value::String(url)) => url,
            Some(Value::Null) | None => DEFAULT_BASE_URL.to_string(),
            Some(other) => {
                return Err(ApiError::invalid_request(format!(
                    "base_url must be a string, got: {other}"
                )));
            }
        };
        validate_base_url(&base_url)?;

        let timeout = match kwargs.remove("timeout_secs") {
            Some(value) => match value.as_u64() {
                Some(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    return Err(ApiError::invalid_request(
                        "timeout_secs must be a positive integer",
                    ));
                }
            },
            None => None,
        };

        match kwargs.get("model") {
            Some(Value::String(model)) if !model.is_empty() => {}
            _ => return Err(ApiError::invalid_request("model is required")),
        }
        if !matches!(kwargs.get("messages"), Some(Value::Array(_))) {
            return Err(ApiError::invalid_request("messages must be an array"));
        }

        Ok(Self {
            base_url,
            api_key,
            timeout,
            body: kwargs,
        })
    }
}
