//! OpenAI-compatible client family (constructible client shape)
//!
//! `OpenAi` is the factory; every attempt builds an `OpenAiClient` bound to one
//! API key. The factory owns the `reqwest::Client`, so reconstruction reuses
//! its connection pool.

use std::time::Duration;

use common::Secret;
use reqwest::Method;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{join_url, send_json, validate_base_url};
use crate::ClientFactory;

/// Default endpoint when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Construction parameters captured at wrap time and replayed on every attempt.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub timeout: Duration,
    pub organization: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            organization: None,
        }
    }
}

impl ClientOptions {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

/// Factory for `OpenAiClient`.
#[derive(Debug, Clone, Default)]
pub struct OpenAi {
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl ClientFactory for OpenAi {
    type Client = OpenAiClient;
    type Options = ClientOptions;
    type Error = ApiError;

    fn construct(&self, credential: &str, options: &ClientOptions) -> Result<OpenAiClient, ApiError> {
        OpenAiClient::new(self.http.clone(), credential, options)
    }
}

/// Client bound to a single API key.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
    timeout: Duration,
    organization: Option<String>,
}

impl OpenAiClient {
    /// Build a client. An empty key is reported as `invalid_api_key` so the
    /// rotation layer skips it like any rejected key.
    pub fn new(
        http: reqwest::Client,
        api_key: &str,
        options: &ClientOptions,
    ) -> Result<Self, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::new("api key must not be empty").with_code("invalid_api_key"));
        }
        validate_base_url(&options.base_url)?;
        Ok(Self {
            http,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            api_key: Secret::new(api_key.to_string()),
            timeout: options.timeout,
            organization: options.organization.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chat(&self) -> Chat<'_> {
        Chat { client: self }
    }

    pub fn models(&self) -> Models<'_> {
        Models { client: self }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method, join_url(&self.base_url, path))
            .bearer_auth(self.api_key.expose())
            .timeout(self.timeout);
        if let Some(org) = &self.organization {
            request = request.header("OpenAI-Organization", org);
        }
        request
    }
}

/// `client.chat()`
pub struct Chat<'a> {
    client: &'a OpenAiClient,
}

impl<'a> Chat<'a> {
    pub fn completions(&self) -> Completions<'a> {
        Completions {
            client: self.client,
        }
    }
}

/// `client.chat().completions()`
pub struct Completions<'a> {
    client: &'a OpenAiClient,
}

impl Completions<'_> {
    /// POST `/chat/completions` with the given request body.
    pub async fn create(&self, body: &Value) -> Result<Value, ApiError> {
        send_json(self.client.request(Method::POST, "chat/completions").json(body)).await
    }
}

/// `client.models()`
pub struct Models<'a> {
    client: &'a OpenAiClient,
}

impl Models<'_> {
    /// GET `/models`.
    pub async fn list(&self) -> Result<Value, ApiError> {
        send_json(self.client.request(Method::GET, "models")).await
    }
}
