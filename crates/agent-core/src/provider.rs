//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all LLM providers (Anthropic,
//! OpenAI-compatible, Ollama, ...) allowing the agent to work with any
//! backend without code changes. Each implementation owns its wire format;
//! the decision loop only ever sees [`ChatRequest`] and [`ChatResponse`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{ChatRequest, GenerationOptions, LlmProvider};
//!
//! let request = ChatRequest {
//!     system_prompt: "You are helpful.",
//!     messages: conversation.messages(),
//!     tools: &registry.list(),
//!     options: &GenerationOptions::default(),
//! };
//! let response = provider.chat(&request).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{Message, TextBlock, ToolCall};
use crate::tool::ToolDefinition;

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per round
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

const fn default_temperature() -> f32 {
    0.7
}
const fn default_max_tokens() -> u32 {
    4096
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// One canonical chat call
#[derive(Clone, Copy, Debug)]
pub struct ChatRequest<'a> {
    pub system_prompt: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
    pub options: &'a GenerationOptions,
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub const fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Fold one round's usage into a running total; absent stays absent
    pub fn accumulate(total: &mut Option<Self>, round: Option<Self>) {
        if let Some(round) = round {
            let acc = total.get_or_insert_with(Self::default);
            acc.input_tokens = acc.input_tokens.saturating_add(round.input_tokens);
            acc.output_tokens = acc.output_tokens.saturating_add(round.output_tokens);
        }
    }
}

/// Canonical response from one chat call
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Prose emitted by the model, if any
    pub text: Option<String>,

    /// Tool calls in the order the model emitted them
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Text positioned among the tool calls, for providers that interleave them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_blocks: Vec<TextBlock>,

    /// Token usage statistics (if the provider reported them)
    pub usage: Option<TokenUsage>,

    /// Model that generated this response
    pub model: Option<String>,

    /// Provider-specific finish reason
    pub stop_reason: Option<String>,
}

impl ChatResponse {
    /// Plain text reply, no tools
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Reply that requests tools
    pub fn tool_calls(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text,
            tool_calls,
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface. Transport and
/// credential failures are returned as errors and end the run.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g. "anthropic")
    fn name(&self) -> &'static str;

    /// Model this client sends requests to
    fn model(&self) -> &str;

    /// Send one request/response round to the provider
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse>;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Estimate token count for text (provider-specific tokenization)
    fn estimate_tokens(&self, text: &str) -> u32 {
        // Default: rough estimate of ~4 chars per token
        u32::try_from(text.len() / 4).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 4096);
    }

    #[test]
    fn test_usage_accumulation() {
        let mut total = None;
        TokenUsage::accumulate(&mut total, None);
        assert_eq!(total, None);

        TokenUsage::accumulate(&mut total, Some(TokenUsage::new(10, 2)));
        TokenUsage::accumulate(&mut total, None);
        TokenUsage::accumulate(&mut total, Some(TokenUsage::new(5, 3)));
        assert_eq!(total, Some(TokenUsage::new(15, 5)));
        assert_eq!(total.unwrap().total(), 20);
    }
}
