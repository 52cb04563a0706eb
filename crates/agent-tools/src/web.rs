//! Web Fetch Tool
//!
//! Plain GET of an http(s) URL; the body is returned as text.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    AgentError, Result, Tool, ToolResult, ToolSchema, parse_input, tool::ParameterSchema,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use url::Url;

use crate::{ToolsConfig, truncate_chars};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const FETCH_USER_AGENT: &str = concat!("rust-agent/", env!("CARGO_PKG_VERSION"));

pub struct WebFetchTool {
    config: Arc<ToolsConfig>,
    client: OnceCell<reqwest::Client>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchParams {
    url: String,
    max_chars: Option<usize>,
}

impl WebFetchTool {
    pub fn new(config: Arc<ToolsConfig>) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// One client per tool, built on first use
    async fn client(&self) -> Result<&reqwest::Client> {
        self.client
            .get_or_try_init(|| async {
                reqwest::Client::builder()
                    .user_agent(FETCH_USER_AGENT)
                    .timeout(FETCH_TIMEOUT)
                    .build()
                    .map_err(|e| AgentError::ToolExecution(format!("http client: {e}")))
            })
            .await
    }

    fn validate_url(raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim())
            .map_err(|e| AgentError::ToolValidation(format!("invalid url '{raw}': {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AgentError::ToolValidation(format!(
                "unsupported url scheme '{other}' (only http and https)"
            ))),
        }
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "web_fetch".into(),
            description: "Fetch the content of an http(s) URL and return the response body \
                          as text. Useful for reading documentation or APIs."
                .into(),
            parameters: vec![
                ParameterSchema::required("url", "string", "The URL to fetch"),
                ParameterSchema::optional(
                    "maxChars",
                    "integer",
                    "Maximum characters of body to return (default 20000)",
                ),
            ],
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let params: FetchParams = parse_input(input)?;
        let url = Self::validate_url(&params.url)?;
        let max_chars = params.max_chars.unwrap_or(self.config.max_fetch_chars);

        tracing::info!(url = %url, "web_fetch");
        let response = self
            .client()
            .await?
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AgentError::ToolExecution(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::ToolExecution(format!("{url} returned {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        // A character is at most four bytes in UTF-8
        let (body, cut) = read_body_capped(response, max_chars.saturating_mul(4))
            .await
            .map_err(|e| AgentError::ToolExecution(format!("reading body of {url}: {e}")))?;

        let (text, char_cut) = truncate_chars(&String::from_utf8_lossy(&body), max_chars);
        let truncated = cut || char_cut;
        tracing::debug!(url = %url, bytes = body.len(), truncated, "web_fetch done");

        Ok(ToolResult::text(text).with_details(json!({
            "url": url.as_str(),
            "status": status.as_u16(),
            "contentType": content_type,
            "truncated": truncated,
        })))
    }
}

/// Stream the body, keeping at most `max_bytes`; `true` if more was sent
async fn read_body_capped(
    mut response: reqwest::Response,
    max_bytes: usize,
) -> reqwest::Result<(Vec<u8>, bool)> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = max_bytes - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Answer one request with `len` bytes of `a`
    async fn serve_body(len: usize) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {len}\r\nconnection: close\r\n\r\n"
            );
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let block = vec![b'a'; 8192];
            let mut sent = 0;
            while sent < len {
                let n = block.len().min(len - sent);
                if socket.write_all(&block[..n]).await.is_err() {
                    return;
                }
                sent += n;
            }
        });
        format!("http://{addr}/large")
    }

    fn direct_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_body_read_stops_at_cap() {
        let url = serve_body(4 * 1024 * 1024).await;
        let response = direct_client().get(url).send().await.unwrap();

        let (body, cut) = read_body_capped(response, 1000).await.unwrap();
        assert_eq!(body.len(), 1000);
        assert!(cut);
    }

    #[tokio::test]
    async fn test_small_body_read_whole() {
        let url = serve_body(300).await;
        let response = direct_client().get(url).send().await.unwrap();

        let (body, cut) = read_body_capped(response, 1000).await.unwrap();
        assert_eq!(body, vec![b'a'; 300]);
        assert!(!cut);
    }

    #[tokio::test]
    async fn test_client_is_reused() {
        let tool = WebFetchTool::new(Arc::new(ToolsConfig::default()));
        let first = tool.client().await.unwrap();
        let second = tool.client().await.unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_validate_url_schemes() {
        assert!(WebFetchTool::validate_url("https://example.com/docs").is_ok());
        assert!(WebFetchTool::validate_url(" http://localhost:8080 ").is_ok());

        let err = WebFetchTool::validate_url("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("file"));
        assert!(WebFetchTool::validate_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_rejects_before_any_request() {
        let tool = WebFetchTool::new(Arc::new(ToolsConfig::default()));

        let err = tool.execute(json!({ "url": "ftp://example.com" })).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));

        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }

    #[test]
    fn test_schema_shape() {
        let tool = WebFetchTool::new(Arc::new(ToolsConfig::default()));
        let schema = tool.schema().to_json_schema();
        assert_eq!(schema["required"], json!(["url"]));
        assert_eq!(schema["properties"]["maxChars"]["type"], "integer");
    }
}
