//! JSON request helper shared by the bundled families

use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

/// Send a request and decode a JSON body, mapping non-success statuses to `ApiError`.
pub(crate) async fn send_json(request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::transport("request failed", e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        debug!(status = status.as_u16(), "upstream returned error status");
        return Err(ApiError::from_response(status.as_u16(), &body));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ApiError::transport("invalid response body", e))
}

/// Join a base URL and a relative path with exactly one slash.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Reject base URLs without an http(s) scheme.
pub(crate) fn validate_base_url(base_url: &str) -> Result<(), ApiError> {
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        Ok(())
    } else {
        Err(ApiError::invalid_request(format!(
            "base_url must start with http:// or https://, got: {base_url}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://api.openai.com/v1/", "/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            join_url("http://localhost:8080", "models"),
            "http://localhost:8080/models"
        );
    }

    #[test]
    fn validate_base_url_requires_scheme() {
        assert!(validate_base_url("https://api.openai.com/v1").is_ok());
        assert!(validate_base_url("http://127.0.0.1:4000").is_ok());
        let err = validate_base_url("api.openai.com").unwrap_err();
        assert!(err.message.contains("must start with http"), "got: {err}");
    }
}
