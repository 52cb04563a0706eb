//! One agent run, shared by `ask`, the REPL and `POST /api/run`.

use std::sync::Arc;

use agent_core::{AgentBuilder, AgentError, Result, RunResult, TokenUsage, ToolInvocation};
use agent_runtime::ProviderKind;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub dry_run: Option<bool>,
    /// Lowers the configured round cap for this run; larger values are clamped
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub reply: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,
}

impl From<RunResult> for RunResponse {
    fn from(result: RunResult) -> Self {
        Self {
            reply: result.reply,
            tool_calls: result.tool_calls,
            model: result.model,
            tokens_used: result.tokens_used,
        }
    }
}

/// Resolve the provider, build an agent and run it once
///
/// Configuration problems (unknown provider, missing key, empty message)
/// are reported before the first model round.
pub async fn execute_run(state: &AppState, request: RunRequest) -> Result<RunResponse> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AgentError::Config("message must not be empty".into()));
    }

    let kind = match request.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(name) => name.parse::<ProviderKind>()?,
        None => state.settings.default_provider,
    };
    let config = state.settings.provider_config(kind, request.model.as_deref());
    let provider = state.create_provider(&config)?;

    let cap = state.settings.max_rounds;
    let max_rounds = match request.max_rounds {
        Some(requested) if requested > cap => {
            tracing::warn!(requested, cap, "Requested round cap clamped to configured maximum");
            cap
        }
        Some(requested) => requested,
        None => cap,
    };

    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(Arc::clone(&state.tools))
        .system_prompt(state.system_prompt())
        .temperature(state.settings.temperature)
        .max_tokens(state.settings.max_tokens)
        .max_rounds(max_rounds)
        .dry_run(request.dry_run.unwrap_or(false))
        .build()?;

    let result = agent.run(message).await?;
    tracing::info!(
        provider = %kind,
        model = %result.model,
        rounds = result.rounds,
        tool_calls = result.tool_calls.len(),
        outcome = ?result.outcome,
        "Run finished"
    );
    Ok(result.into())
}
