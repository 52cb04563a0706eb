//! Shared HTTP plumbing for provider adapters.

use std::time::Duration;

use agent_core::{AgentError, Result};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

const AGENT_USER_AGENT: &str = concat!("rust-agent/", env!("CARGO_PKG_VERSION"));

/// Build a client with JSON defaults plus provider-specific headers
pub fn build_client(mut headers: HeaderMap, timeout_secs: u64) -> Result<reqwest::Client> {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(AGENT_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))
}

/// Header value holding a secret; invalid characters are a setup mistake
pub fn secret_header(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| AgentError::Config("API key contains invalid characters".into()))?;
    header.set_sensitive(true);
    Ok(header)
}

/// POST a JSON body and decode the JSON reply
pub async fn post_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
    provider: &str,
) -> Result<T> {
    tracing::debug!(provider, url, bytes = body.to_string().len(), "Sending provider request");

    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| AgentError::ProviderUnavailable(format!("{provider}: {e}")))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| AgentError::ProviderUnavailable(format!("{provider}: {e}")))?;

    if !status.is_success() {
        return Err(status_error(provider, status, &text));
    }

    tracing::debug!(provider, %status, bytes = text.len(), "Provider responded");
    serde_json::from_str(&text)
        .map_err(|e| AgentError::Parse(format!("{provider} response: {e}")))
}

/// Map a non-2xx status onto the error taxonomy
pub fn status_error(provider: &str, status: StatusCode, body: &str) -> AgentError {
    let detail = format!("{provider} returned {status}: {}", truncate(body, 500));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(detail),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error("openai", StatusCode::UNAUTHORIZED, ""),
            AgentError::Auth(_)
        ));
        assert!(matches!(
            status_error("openai", StatusCode::TOO_MANY_REQUESTS, ""),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            status_error("anthropic", StatusCode::BAD_GATEWAY, ""),
            AgentError::ProviderUnavailable(_)
        ));

        let err = status_error("anthropic", StatusCode::BAD_REQUEST, "tools.0: bad schema");
        assert!(matches!(err, AgentError::Provider(_)));
        assert!(err.to_string().contains("bad schema"));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        let err = status_error("openai", StatusCode::BAD_REQUEST, &body);
        assert!(err.to_string().len() < 700);
    }

    #[test]
    fn test_secret_header_rejects_newlines() {
        assert!(secret_header("sk-ok").unwrap().is_sensitive());
        assert!(secret_header("sk-bad\n").is_err());
    }
}
