//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern for agent behavior.
//! Each round sends the whole conversation and tool catalogue to the
//! provider; tool calls are dispatched strictly in the order the model
//! emitted them and their results are folded back as one tool message.
//! The run ends on the first tool-free response or when the round cap is hit.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, ToolCall, ToolResultEntry};
use crate::provider::{ChatRequest, ChatResponse, GenerationOptions, LlmProvider, TokenUsage};
use crate::tool::{Tool, ToolRegistry, ToolResult};

/// Round cap used when none is configured
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Base instructions for a tool-using assistant
pub const DEFAULT_SYSTEM_PROMPT: &str = r"You are a capable automation assistant.

You can act on the user's behalf by calling the tools you are given.
Call a tool whenever it gets you closer to a correct answer; inspect each
result before deciding the next step. Tool calls in one turn run in the
order you list them, so later calls may rely on earlier ones.

When you have what you need, answer directly and concisely without
calling further tools.";

/// Reply used when the round cap is reached without a final answer
pub fn round_limit_reply(max_rounds: usize) -> String {
    format!("Stopped after {max_rounds} rounds without a final answer (round limit reached).")
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt sent with every round
    pub system_prompt: String,

    /// Maximum model rounds before giving up (always finite, at least 1)
    pub max_rounds: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Describe requested tool calls instead of running them
    pub dry_run: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            generation: GenerationOptions::default(),
            dry_run: false,
        }
    }
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model produced a tool-free answer
    Completed,
    /// The round cap was hit
    RoundLimit,
    /// Dry-run preview of requested tool calls
    DryRun,
}

/// One dispatched tool call, for audit
#[derive(Clone, Debug, Serialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: Value,
    pub result: ToolResult,
}

/// Everything a caller gets back from one run
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Final reply text
    pub reply: String,

    /// Every dispatched tool call, in dispatch order
    pub tool_calls: Vec<ToolInvocation>,

    /// Model identifier used
    pub model: String,

    /// Summed usage over all rounds (if the provider reported any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,

    /// Model rounds performed
    pub rounds: usize,

    pub outcome: RunOutcome,

    /// Full transcript of the run
    #[serde(skip)]
    pub conversation: Conversation,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Run the agent on a user message
    pub async fn run(&self, message: &str) -> Result<RunResult> {
        self.run_with_dry_run(message, self.config.dry_run).await
    }

    /// Run with an explicit dry-run flag for this request only
    pub async fn run_with_dry_run(&self, message: &str, dry_run: bool) -> Result<RunResult> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "agent_run",
            %run_id,
            provider = self.provider.name(),
            model = self.provider.model(),
            dry_run,
        );
        self.run_rounds(message, dry_run).instrument(span).await
    }

    async fn run_rounds(&self, message: &str, dry_run: bool) -> Result<RunResult> {
        let max_rounds = self.config.max_rounds.max(1);
        let catalogue = self.tools.list();
        let mut conversation = Conversation::from_user(message);
        let mut invocations: Vec<ToolInvocation> = Vec::new();
        let mut usage: Option<TokenUsage> = None;
        let mut model = self.provider.model().to_string();

        tracing::info!(tools = catalogue.len(), max_rounds, "Agent run started");

        for round in 1..=max_rounds {
            let request = ChatRequest {
                system_prompt: &self.config.system_prompt,
                messages: conversation.messages(),
                tools: &catalogue,
                options: &self.config.generation,
            };

            // Provider errors are fatal to the run and propagate unchanged.
            let response = self.provider.chat(&request).await?;

            TokenUsage::accumulate(&mut usage, response.usage);
            if let Some(reported) = &response.model {
                model.clone_from(reported);
            }

            let ChatResponse {
                text,
                mut tool_calls,
                text_blocks,
                ..
            } = response;
            ensure_unique_ids(&mut tool_calls);

            if tool_calls.is_empty() {
                let reply = text.unwrap_or_default();
                tracing::info!(round, dispatched = invocations.len(), "Agent run completed");
                conversation.push(Message::assistant(reply.clone()));
                return Ok(RunResult {
                    reply,
                    tool_calls: invocations,
                    model,
                    tokens_used: usage,
                    rounds: round,
                    outcome: RunOutcome::Completed,
                    conversation,
                });
            }

            if dry_run {
                tracing::info!(requested = tool_calls.len(), "Dry run: skipping tool dispatch");
                let reply = describe_tool_calls(&tool_calls);
                conversation.push(
                    Message::assistant_with_tools(text, tool_calls).with_text_blocks(text_blocks),
                );
                return Ok(RunResult {
                    reply,
                    tool_calls: Vec::new(),
                    model,
                    tokens_used: usage,
                    rounds: round,
                    outcome: RunOutcome::DryRun,
                    conversation,
                });
            }

            tracing::debug!(round, requested = tool_calls.len(), "Dispatching tool calls");
            conversation.push(
                Message::assistant_with_tools(text, tool_calls.clone()).with_text_blocks(text_blocks),
            );

            let mut entries = Vec::with_capacity(tool_calls.len());
            for call in tool_calls {
                let result = self.tools.dispatch(&call.name, call.input.clone()).await;
                entries.push(ToolResultEntry::new(call.id.clone(), result.content_text()));
                invocations.push(ToolInvocation {
                    id: call.id,
                    name: call.name,
                    input: call.input,
                    result,
                });
            }

            conversation.push_tool_results(entries)?;
        }

        tracing::warn!(max_rounds, dispatched = invocations.len(), "Round limit reached");
        Ok(RunResult {
            reply: round_limit_reply(max_rounds),
            tool_calls: invocations,
            model,
            tokens_used: usage,
            rounds: max_rounds,
            outcome: RunOutcome::RoundLimit,
            conversation,
        })
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Give every call of one assistant turn a distinct, non-empty id
///
/// Tool results are paired with calls by id, so a repeated or blank id
/// is rewritten before anything is dispatched.
fn ensure_unique_ids(calls: &mut [ToolCall]) {
    let taken: HashSet<String> = calls.iter().map(|c| c.id.clone()).collect();
    let mut seen = HashSet::with_capacity(calls.len());

    for (idx, call) in calls.iter_mut().enumerate() {
        if !call.id.is_empty() && seen.insert(call.id.clone()) {
            continue;
        }

        let base = if call.id.is_empty() {
            "tool_call".to_string()
        } else {
            call.id.clone()
        };
        let mut suffix = idx;
        let mut candidate = format!("{base}_{suffix}");
        while taken.contains(&candidate) || seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{base}_{suffix}");
        }

        tracing::warn!(
            original = %call.id,
            repaired = %candidate,
            tool = %call.name,
            "Repaired tool call id"
        );
        seen.insert(candidate.clone());
        call.id = candidate;
    }
}

/// Human-readable preview of tool calls that were not executed
fn describe_tool_calls(calls: &[ToolCall]) -> String {
    let mut out = format!(
        "[dry run] The model requested {} tool call(s); none were executed:\n",
        calls.len()
    );
    for call in calls {
        let params =
            serde_json::to_string_pretty(&call.input).unwrap_or_else(|_| call.input.to_string());
        out.push_str(&format!("\n- {} (id: {})\n", call.name, call.id));
        for line in params.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    shared_tools: Option<Arc<ToolRegistry>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            shared_tools: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Use a registry built elsewhere (usually at process start)
    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.shared_tools = Some(tools);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_tokens(mut self, max: u32) -> Self {
        self.config.generation.max_tokens = max;
        self
    }

    #[must_use]
    pub const fn max_rounds(mut self, max: usize) -> Self {
        self.config.max_rounds = max;
        self
    }

    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.config.dry_run = enabled;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_rounds == 0 {
            return Err(AgentError::Config("max_rounds must be at least 1".into()));
        }

        let tools = match self.shared_tools {
            Some(_) if !self.tools.is_empty() => {
                return Err(AgentError::Config(
                    "use either a shared registry or individual tools, not both".into(),
                ));
            }
            Some(shared) => shared,
            None => Arc::new(self.tools),
        };

        Ok(Agent::new(provider, tools, self.config))
    }
}
