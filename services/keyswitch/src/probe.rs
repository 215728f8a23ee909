//! One probe call per configured provider
//!
//! Wraps the provider's target with its key pool and sends a single-message
//! chat request, returning the assistant's reply text.

use std::time::Duration;

use anyhow::{Context, Result};
use key_pool::{Kwargs, Switcher, TargetKind};
use provider::{ClientOptions, Completion, OpenAi, openai::DEFAULT_BASE_URL};
use serde_json::{Value, json};
use tracing::info;

use crate::config::ProviderConfig;

/// Prompt settings shared by every probe.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
    pub max_tokens: u32,
}

impl Prompt {
    fn messages(&self) -> Value {
        json!([{"role": "user", "content": self.text}])
    }
}

/// Run the probe for `name` and return the reply text.
pub async fn run(
    name: &str,
    provider: &ProviderConfig,
    switcher: &Switcher,
    http: &reqwest::Client,
    prompt: &Prompt,
) -> Result<String> {
    let kind = provider.target_kind(name)?;
    info!(
        provider = name,
        target = %kind,
        keys = provider.api_keys.len(),
        model = %provider.model,
        "probing provider"
    );

    let response = match kind {
        TargetKind::Client => {
            let options = ClientOptions::default()
                .with_base_url(provider.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
                .with_timeout(Duration::from_secs(provider.timeout_secs));
            let client = switcher
                .client(OpenAi::new(http.clone()))
                .build(provider.api_keys.clone(), options)?;
            let body = json!({
                "model": provider.model,
                "messages": prompt.messages(),
                "max_tokens": prompt.max_tokens,
            });
            client.chat().completions().create(&body).await?
        }
        TargetKind::Callable => {
            let mut fixed = Kwargs::new();
            fixed.insert("model".into(), json!(provider.model));
            fixed.insert("timeout_secs".into(), json!(provider.timeout_secs));
            if let Some(base_url) = &provider.base_url {
                fixed.insert("base_url".into(), json!(base_url));
            }
            let completion = switcher
                .callable(Completion::new(http.clone()))
                .build(provider.api_keys.clone(), fixed)?;

            let mut kwargs = Kwargs::new();
            kwargs.insert("messages".into(), prompt.messages());
            kwargs.insert("max_tokens".into(), json!(prompt.max_tokens));
            completion.call(kwargs).await?
        }
    };

    reply_text(&response).with_context(|| format!("{name}: response has no message content"))
}

fn reply_text(response: &Value) -> Option<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use key_pool::Diagnostics;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> Prompt {
        Prompt {
            text: "Say hello in one word".into(),
            max_tokens: 10,
        }
    }

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
    }

    fn provider_config(yaml: &str) -> ProviderConfig {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();
        let mut config = Config::load(&path).unwrap();
        config.providers.remove("probe").unwrap()
    }

    #[test]
    fn reply_text_reads_first_choice() {
        let response = json!({"choices": [{"message": {"content": " Hello \n"}}]});
        assert_eq!(reply_text(&response).as_deref(), Some("Hello"));
        assert!(reply_text(&json!({"choices": []})).is_none());
    }

    #[tokio::test]
    async fn client_probe_rotates_and_returns_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-probe-limited"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached", "code": "rate_limit_exceeded"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-probe-ok"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "max_tokens": 10})))
            .respond_with(reply("Hello"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_config(&format!(
            "probe:\n  base_url: {}\n  api_keys: [sk-probe-limited, sk-probe-ok]\n  model: gpt-4o-mini\n  target: client\n",
            server.uri()
        ));
        let text = run(
            "probe",
            &provider,
            &Switcher::new(Diagnostics::enabled()),
            &reqwest::Client::new(),
            &prompt(),
        )
        .await
        .unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn callable_probe_sends_fixed_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-probe-one"))
            .and(body_partial_json(json!({"model": "small-model"})))
            .respond_with(reply("Hi"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_config(&format!(
            "probe:\n  base_url: {}\n  api_keys: sk-probe-one\n  model: small-model\n  target: callable\n",
            server.uri()
        ));
        let text = run(
            "probe",
            &provider,
            &Switcher::default(),
            &reqwest::Client::new(),
            &prompt(),
        )
        .await
        .unwrap();
        assert_eq!(text, "Hi");
    }

    #[tokio::test]
    async fn terminal_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "model not found", "code": "model_not_found"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_config(&format!(
            "probe:\n  base_url: {}\n  api_keys: [sk-probe-x, sk-probe-y]\n  model: missing\n  target: client\n",
            server.uri()
        ));
        let err = run(
            "probe",
            &provider,
            &Switcher::default(),
            &reqwest::Client::new(),
            &prompt(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("model not found"), "got: {err}");
    }
}
