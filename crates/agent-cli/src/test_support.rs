//! Scripted provider and state fixtures shared by the front-end tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use agent_core::{
    ChatRequest, ChatResponse, LlmProvider, Result, ToolCall, ToolRegistry, TokenUsage,
};
use agent_runtime::{ProviderConfig, RuntimeSettings};
use async_trait::async_trait;

use crate::state::AppState;

/// Replays canned responses, then answers "done"
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ChatResponse>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ChatResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn chat(&self, _request: &ChatRequest<'_>) -> Result<ChatResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ChatResponse::text("done")))
    }
}

pub fn tool_call(id: &str, name: &str, input: serde_json::Value) -> ChatResponse {
    ChatResponse::tool_calls(None, vec![ToolCall::new(id, name, input)])
        .with_usage(TokenUsage::new(10, 5))
}

/// State backed by `provider`, recording every config the factory sees
pub fn state_with(
    provider: Arc<ScriptedProvider>,
    workspace: PathBuf,
) -> (AppState, Arc<Mutex<Vec<ProviderConfig>>>) {
    let mut registry = ToolRegistry::new();
    agent_tools::register_builtin_tools(
        &mut registry,
        &agent_tools::ToolsConfig::with_workspace(&workspace),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let state = AppState::new(RuntimeSettings::default(), Arc::new(registry), workspace)
        .with_provider_factory(Arc::new(
            move |config: &ProviderConfig| -> Result<Arc<dyn LlmProvider>> {
                recorder.lock().unwrap().push(config.clone());
                Ok(Arc::clone(&provider) as Arc<dyn LlmProvider>)
            },
        ));
    (state, seen)
}
