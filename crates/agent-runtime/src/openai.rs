//! OpenAI-compatible Chat Completions Provider
//!
//! Implementation of `LlmProvider` for `POST {base}/chat/completions`.
//! Serves OpenAI itself and any compatible endpoint, including a local
//! Ollama server at `<OLLAMA_HOST>/v1`.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, ToolCall},
    provider::{ChatRequest, ChatResponse, LlmProvider, TokenUsage},
    tool::ToolDefinition,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::{ProviderConfig, ProviderKind};
use crate::http;

/// OpenAI-compatible LLM provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    label: &'static str,
}

impl OpenAiProvider {
    /// Create from a resolved provider configuration
    ///
    /// Bearer auth is only attached when a key is present, so keyless
    /// local servers work unchanged.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(AUTHORIZATION, http::secret_header(&format!("Bearer {key}"))?);
        }

        let label = match config.kind {
            ProviderKind::Ollama => "ollama",
            _ => "openai",
        };

        Ok(Self {
            client: http::build_client(headers, config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            label,
        })
    }

    /// Build the JSON request body
    pub fn build_body(model: &str, request: &ChatRequest<'_>) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(json!({ "role": "system", "content": request.system_prompt }));
        }
        messages.extend(convert_messages(request.messages));

        let mut body = json!({
            "model": model,
            "max_tokens": request.options.max_tokens,
            "temperature": request.options.temperature,
            "messages": messages,
        });

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(convert_tool).collect());
            body["tool_choice"] = json!("auto");
        }
        body
    }

    fn convert_response(response: CompletionResponse) -> Result<ChatResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("chat completion has no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, call)| {
                let id = if call.id.is_empty() {
                    format!("tool_call_{idx}")
                } else {
                    call.id
                };
                ToolCall::new(id, call.function.name, parse_arguments(&call.function.arguments))
            })
            .collect();

        Ok(ChatResponse {
            text: choice.message.content.filter(|t| !t.is_empty()),
            tool_calls,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            model: response.model,
            stop_reason: choice.finish_reason,
            ..ChatResponse::default()
        })
    }

    /// Decode a raw JSON reply
    pub fn parse_response(raw: Value) -> Result<ChatResponse> {
        let response: CompletionResponse = serde_json::from_value(raw)
            .map_err(|e| AgentError::Parse(format!("chat completion response: {e}")))?;
        Self::convert_response(response)
    }
}

fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            Message::System { content } => {
                out.push(json!({ "role": "system", "content": content }));
            }
            Message::User { content } => {
                out.push(json!({ "role": "user", "content": content }));
            }
            Message::Assistant {
                text, tool_calls, ..
            } => {
                let mut entry = json!({
                    "role": "assistant",
                    "content": text.as_deref().filter(|t| !t.is_empty()),
                });
                if !tool_calls.is_empty() {
                    entry["tool_calls"] = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.input.to_string(),
                                },
                            })
                        })
                        .collect();
                }
                out.push(entry);
            }
            // One tool message per result
            Message::Tool { results } => {
                out.extend(results.iter().map(|r| {
                    json!({
                        "role": "tool",
                        "tool_call_id": r.tool_call_id,
                        "content": r.content,
                    })
                }));
            }
        }
    }
    out
}

fn convert_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        },
    })
}

// Arguments arrive as a JSON string; unparsable text is passed through for
// the tool's own validation to report.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| {
        tracing::warn!(arguments = raw, "Tool call arguments are not valid JSON");
        Value::String(raw.to_string())
    })
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    // Some compatible servers send an explicit null
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.label
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let body = Self::build_body(&self.model, request);
        let response: CompletionResponse =
            http::post_json(&self.client, &self.endpoint, &body, self.label).await?;
        Self::convert_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::message::ToolResultEntry;
    use agent_core::provider::GenerationOptions;

    fn config(kind: ProviderKind, api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            kind,
            api_key: api_key.map(String::from),
            model: "gpt-test".into(),
            base_url: "http://localhost:11434/v1/".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_system_prompt_is_first_message() {
        let messages = vec![Message::user("hi")];
        let options = GenerationOptions::default();
        let request = ChatRequest {
            system_prompt: "You are helpful.",
            messages: &messages,
            tools: &[],
            options: &options,
        };

        let body = OpenAiProvider::build_body("gpt-test", &request);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_tool_round_trip_shape() {
        let messages = vec![
            Message::user("list and read"),
            Message::assistant_with_tools(
                None,
                vec![
                    ToolCall::new("call_a", "shell_exec", json!({"command": "ls"})),
                    ToolCall::new("call_b", "file_read", json!({"filePath": "a.txt"})),
                ],
            ),
            Message::tool_results(vec![
                ToolResultEntry::new("call_a", "a.txt"),
                ToolResultEntry::new("call_b", "contents"),
            ]),
        ];
        let wire = convert_messages(&messages);

        assert_eq!(wire.len(), 4);
        assert!(wire[1]["content"].is_null());
        let args = wire[1]["tool_calls"][0]["function"]["arguments"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(args).unwrap()["command"], "ls");
        assert_eq!(wire[2]["role"], "tool");
        assert_eq!(wire[2]["tool_call_id"], "call_a");
        assert_eq!(wire[3]["tool_call_id"], "call_b");
    }

    #[test]
    fn test_tools_wrapped_as_functions() {
        let tools = vec![ToolDefinition {
            name: "web_fetch".into(),
            description: "Fetch a URL".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        }];
        let options = GenerationOptions::default();
        let request = ChatRequest {
            system_prompt: "",
            messages: &[],
            tools: &tools,
            options: &options,
        };

        let body = OpenAiProvider::build_body("m", &request);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "web_fetch");
        assert_eq!(body["messages"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw = json!({
            "model": "gpt-test",
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        { "id": "call_1", "type": "function",
                          "function": { "name": "file_read", "arguments": "{\"filePath\":\"x\"}" } },
                        { "id": "", "type": "function",
                          "function": { "name": "shell_exec", "arguments": "not json" } }
                    ]
                }
            }],
            "usage": { "prompt_tokens": 30, "completion_tokens": 4, "total_tokens": 34 }
        });

        let response = OpenAiProvider::parse_response(raw).unwrap();
        assert!(response.text.is_none());
        assert_eq!(response.tool_calls[0].input["filePath"], "x");
        assert_eq!(response.tool_calls[1].id, "tool_call_1");
        assert_eq!(response.tool_calls[1].input, json!("not json"));
        assert_eq!(response.usage, Some(TokenUsage::new(30, 4)));
    }

    #[test]
    fn test_parse_text_response_and_empty_choices() {
        let raw = json!({
            "choices": [{ "message": { "content": "Done." }, "finish_reason": "stop" }]
        });
        let response = OpenAiProvider::parse_response(raw).unwrap();
        assert_eq!(response.text.as_deref(), Some("Done."));
        assert!(!response.has_tool_calls());
        assert!(response.usage.is_none());

        let err = OpenAiProvider::parse_response(json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[test]
    fn test_label_and_endpoint() {
        let ollama = OpenAiProvider::new(&config(ProviderKind::Ollama, None)).unwrap();
        assert_eq!(ollama.name(), "ollama");
        assert_eq!(ollama.endpoint, "http://localhost:11434/v1/chat/completions");

        let openai = OpenAiProvider::new(&config(ProviderKind::OpenAi, Some("sk-test"))).unwrap();
        assert_eq!(openai.name(), "openai");
        assert_eq!(openai.model(), "gpt-test");
    }
}
