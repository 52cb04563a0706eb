//! Anthropic Messages API Provider
//!
//! Implementation of `LlmProvider` for `POST /v1/messages`.
//!
//! Wire shape differences from the canonical model:
//! - the system prompt is a dedicated top-level field
//! - assistant tool calls are `tool_use` content blocks
//! - tool results are `tool_result` blocks nested in one user-role message

use agent_core::{
    error::{AgentError, Result},
    message::{Message, TextBlock, ToolCall},
    provider::{ChatRequest, ChatResponse, LlmProvider, TokenUsage},
    tool::ToolDefinition,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::ProviderConfig;
use crate::http;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic LLM provider
pub struct AnthropicProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl AnthropicProvider {
    /// Create from a resolved provider configuration; the API key is required
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AgentError::Config("ANTHROPIC_API_KEY is not set".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", http::secret_header(api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        Ok(Self {
            client: http::build_client(headers, config.timeout_secs)?,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    /// Build the JSON request body
    pub fn build_body(model: &str, request: &ChatRequest<'_>) -> Value {
        let (extra_system, messages) = convert_messages(request.messages);

        let system = match extra_system {
            Some(extra) if request.system_prompt.is_empty() => extra,
            Some(extra) => format!("{}\n\n{extra}", request.system_prompt),
            None => request.system_prompt.to_string(),
        };

        let mut body = json!({
            "model": model,
            "max_tokens": request.options.max_tokens,
            "temperature": request.options.temperature,
            "messages": messages,
        });

        if !system.is_empty() {
            body["system"] = Value::String(system);
        }
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(convert_tool).collect());
        }
        body
    }

    /// Translate a decoded reply into the canonical response
    fn convert_response(response: MessagesResponse) -> Result<ChatResponse> {
        let mut text_blocks = Vec::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                ContentBlock::Text { text } if text.is_empty() => {}
                ContentBlock::Text { text } => {
                    text_blocks.push(TextBlock::new(tool_calls.len(), text));
                }
                ContentBlock::ToolUse { id, name, input } => {
                    if name.is_empty() {
                        return Err(AgentError::Parse(
                            "anthropic tool_use block without a name".into(),
                        ));
                    }
                    tool_calls.push(ToolCall::new(id, name, input));
                }
                ContentBlock::Other => {}
            }
        }

        let text = (!text_blocks.is_empty()).then(|| {
            text_blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        });

        Ok(ChatResponse {
            text,
            tool_calls,
            text_blocks,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens)),
            model: response.model,
            stop_reason: response.stop_reason,
        })
    }

    /// Decode a raw JSON reply
    pub fn parse_response(raw: Value) -> Result<ChatResponse> {
        let response: MessagesResponse = serde_json::from_value(raw)
            .map_err(|e| AgentError::Parse(format!("anthropic response: {e}")))?;
        Self::convert_response(response)
    }
}

/// Canonical history to Anthropic messages; system entries are returned separately
fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system_parts = Vec::new();
    let mut out = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            Message::System { content } => system_parts.push(content.clone()),
            Message::User { content } => out.push(json!({
                "role": "user",
                "content": content,
            })),
            Message::Assistant {
                text,
                tool_calls,
                text_blocks,
            } => {
                let mut blocks = Vec::new();
                if text_blocks.is_empty() {
                    if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                        blocks.push(text_block(text));
                    }
                    blocks.extend(tool_calls.iter().map(tool_use_block));
                } else {
                    // Replay prose and tool_use blocks in the order they arrived
                    let mut pending = text_blocks.iter().peekable();
                    for (idx, call) in tool_calls.iter().enumerate() {
                        while let Some(block) = pending.next_if(|b| b.position <= idx) {
                            blocks.push(text_block(&block.text));
                        }
                        blocks.push(tool_use_block(call));
                    }
                    blocks.extend(pending.map(|b| text_block(&b.text)));
                }
                if blocks.is_empty() {
                    blocks.push(json!({ "type": "text", "text": "(no content)" }));
                }
                out.push(json!({ "role": "assistant", "content": blocks }));
            }
            Message::Tool { results } => {
                let blocks: Vec<Value> = results
                    .iter()
                    .map(|r| {
                        json!({
                            "type": "tool_result",
                            "tool_use_id": r.tool_call_id,
                            "content": r.content,
                        })
                    })
                    .collect();
                out.push(json!({ "role": "user", "content": blocks }));
            }
        }
    }

    let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));
    (system, out)
}

fn text_block(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

fn tool_use_block(call: &ToolCall) -> Value {
    json!({
        "type": "tool_use",
        "id": call.id,
        "name": call.name,
        "input": object_or_empty(&call.input),
    })
}

// tool_use.input must be an object on the wire
fn object_or_empty(input: &Value) -> Value {
    if input.is_object() {
        input.clone()
    } else {
        json!({})
    }
}

fn convert_tool(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters,
    })
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: Option<String>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let body = Self::build_body(&self.model, request);
        let response: MessagesResponse =
            http::post_json(&self.client, &self.endpoint, &body, self.name()).await?;
        Self::convert_response(response)
    }
}
