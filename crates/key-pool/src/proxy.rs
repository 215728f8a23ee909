//! Enumerated forwarding for the OpenAI-compatible client
//!
//! `rotating.chat().completions().create(&body)` mirrors the underlying
//! client's call chain. Intermediate accessors only borrow the wrapper and
//! never fail; the terminal method is where rotation happens.

use provider::{ApiError, BoxFuture, ClientCall, OpenAi, OpenAiClient};
use serde_json::Value;

use crate::wrap::RotatingClient;

impl RotatingClient<OpenAi> {
    pub fn chat(&self) -> ChatProxy<'_> {
        ChatProxy { client: self }
    }

    pub fn models(&self) -> ModelsProxy<'_> {
        ModelsProxy { client: self }
    }
}

/// `rotating.chat()`
#[derive(Debug, Clone, Copy)]
pub struct ChatProxy<'a> {
    client: &'a RotatingClient<OpenAi>,
}

impl<'a> ChatProxy<'a> {
    pub fn completions(&self) -> CompletionsProxy<'a> {
        CompletionsProxy {
            client: self.client,
        }
    }
}

/// `rotating.chat().completions()`
#[derive(Debug, Clone, Copy)]
pub struct CompletionsProxy<'a> {
    client: &'a RotatingClient<OpenAi>,
}

impl CompletionsProxy<'_> {
    /// POST `/chat/completions`, rotating keys on 429/401/403.
    pub async fn create(&self, body: &Value) -> Result<Value, ApiError> {
        self.client.call(&CreateChatCompletion { body }).await
    }
}

/// `rotating.models()`
#[derive(Debug, Clone, Copy)]
pub struct ModelsProxy<'a> {
    client: &'a RotatingClient<OpenAi>,
}

impl ModelsProxy<'_> {
    /// GET `/models`, rotating keys on 429/401/403.
    pub async fn list(&self) -> Result<Value, ApiError> {
        self.client.call(&ListModels).await
    }
}

struct CreateChatCompletion<'b> {
    body: &'b Value,
}

impl ClientCall<OpenAiClient> for CreateChatCompletion<'_> {
    type Output = Value;
    type Error = ApiError;

    fn call(&self, client: OpenAiClient) -> BoxFuture<'_, Result<Value, ApiError>> {
        Box::pin(async move { client.chat().completions().create(self.body).await })
    }
}

struct ListModels;

impl ClientCall<OpenAiClient> for ListModels {
    type Output = Value;
    type Error = ApiError;

    fn call(&self, client: OpenAiClient) -> BoxFuture<'_, Result<Value, ApiError>> {
        Box::pin(async move { client.models().list().await })
    }
}
