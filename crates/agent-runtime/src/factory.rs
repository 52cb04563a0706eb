//! Provider construction from a resolved configuration.

use std::sync::Arc;

use agent_core::{AgentError, LlmProvider, Result};

use crate::anthropic::AnthropicProvider;
use crate::config::{ProviderConfig, ProviderKind};
use crate::openai::OpenAiProvider;

/// Build the provider client named by `config.kind`
///
/// Anthropic and OpenAI require a non-blank API key; Ollama needs none.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    if config.kind.requires_api_key()
        && config.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
    {
        return Err(AgentError::Config(format!(
            "No API key configured for provider '{}' (set {})",
            config.kind,
            key_variable(config.kind)
        )));
    }

    tracing::debug!(provider = %config.kind, model = %config.model, "Creating provider");

    let provider: Arc<dyn LlmProvider> = match config.kind {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderKind::OpenAi | ProviderKind::Ollama => Arc::new(OpenAiProvider::new(config)?),
    };
    Ok(provider)
}

const fn key_variable(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Ollama => "OLLAMA_HOST",
    }
}
