//! Error type shared by the bundled target families

use serde_json::Value;

use crate::{Classify, ErrorClassification, classify_code, classify_status};

/// Error raised by an OpenAI-compatible endpoint or its transport.
///
/// Parsed from the `{"error":{"message","type","code"}}` envelope. Transport
/// failures carry no status and classify as Terminal.
#[derive(Debug, thiserror::Error)]
#[error("API error{}: {message}", status_suffix(.status))]
pub struct ApiError {
    /// HTTP status, if a response was received
    pub status: Option<u16>,
    /// Provider error code (`error.code`)
    pub code: Option<String>,
    /// Provider error type tag (`error.type`)
    pub kind: Option<String>,
    pub message: String,
    #[source]
    source: Option<reqwest::Error>,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" ({s})"),
        None => String::new(),
    }
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            kind: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Malformed arguments caught before any request is sent.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(message).with_code("invalid_request")
    }

    /// Transport or decode failure from reqwest.
    pub fn transport(context: &str, err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            code: None,
            kind: None,
            message: format!("{context}: {err}"),
            source: Some(err),
        }
    }

    /// Build from a non-success response status and body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let mut err = Self::new(String::new()).with_status(status);
        match serde_json::from_str::<Value>(body) {
            Ok(json) => {
                let envelope = json.get("error").unwrap_or(&json);
                match envelope {
                    Value::String(msg) => err.message = msg.clone(),
                    Value::Object(obj) => {
                        err.message = obj
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        err.kind = obj.get("type").and_then(Value::as_str).map(str::to_string);
                        err.code = match obj.get("code") {
                            Some(Value::String(code)) => Some(code.clone()),
                            Some(Value::Number(code)) => Some(code.to_string()),
                            _ => None,
                        };
                    }
                    _ => {}
                }
            }
            Err(_) => err.message = body.trim().to_string(),
        }
        if err.message.is_empty() {
            err.message = format!("status {status} with no error message");
        }
        err
    }
}

impl Classify for ApiError {
    /// A recognized code or type tag wins over the status; an unknown code
    /// defers to the status.
    fn classify(&self) -> ErrorClassification {
        self.code
            .as_deref()
            .and_then(classify_code)
            .or_else(|| self.kind.as_deref().and_then(classify_code))
            .or_else(|| self.status.map(classify_status))
            .unwrap_or(ErrorClassification::Terminal)
    }
}

/// Classify an arbitrary error by walking its `source()` chain.
///
/// The first `ApiError`, or `reqwest::Error` carrying a status, decides.
/// Anything else is Terminal.
pub fn classify_error_chain(err: &(dyn std::error::Error + 'static)) -> ErrorClassification {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            return api.classify();
        }
        if let Some(status) = e.downcast_ref::<reqwest::Error>().and_then(|r| r.status()) {
            return classify_status(status.as_u16());
        }
        current = e.source();
    }
    ErrorClassification::Terminal
}

impl Classify for Box<dyn std::error::Error + Send + Sync> {
    fn classify(&self) -> ErrorClassification {
        let err: &(dyn std::error::Error + 'static) = self.as_ref();
        classify_error_chain(err)
    }
}
