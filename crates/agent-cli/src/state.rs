//! Application State

use std::path::PathBuf;
use std::sync::Arc;

use agent_core::{LlmProvider, Result, ToolRegistry};
use agent_runtime::{ProviderConfig, RuntimeSettings, create_provider};

use crate::prompt;

/// Builds a provider client for one run
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn LlmProvider>> + Send + Sync>;

/// Process-wide state shared by every front end
#[derive(Clone)]
pub struct AppState {
    /// Settings read once at startup
    pub settings: Arc<RuntimeSettings>,

    /// Tool registry with all available tools
    pub tools: Arc<ToolRegistry>,

    /// Workspace root handed to tools and the system prompt
    pub workspace: PathBuf,

    provider_factory: ProviderFactory,
}

impl AppState {
    pub fn new(settings: RuntimeSettings, tools: Arc<ToolRegistry>, workspace: PathBuf) -> Self {
        Self {
            settings: Arc::new(settings),
            tools,
            workspace,
            provider_factory: Arc::new(create_provider),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.provider_factory = factory;
        self
    }

    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
        (self.provider_factory)(config)
    }

    /// System prompt for a run starting now
    pub fn system_prompt(&self) -> String {
        prompt::build_system_prompt(&self.workspace, chrono::Utc::now())
    }
}
