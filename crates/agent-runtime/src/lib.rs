//! # agent-runtime
//!
//! Provider adapters for the rust-agent system.
//!
//! ## Providers
//!
//! - **Anthropic**: Messages API (`/v1/messages`)
//! - **OpenAI**: Chat Completions, or any compatible endpoint
//! - **Ollama**: local inference through its OpenAI-compatible `/v1` API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{create_provider, ProviderKind, RuntimeSettings};
//!
//! let settings = RuntimeSettings::from_env()?;
//! let provider = create_provider(&settings.provider_config(ProviderKind::Ollama, None))?;
//! let agent = AgentBuilder::new()
//!     .provider(provider)
//!     .build()?;
//! ```

pub mod anthropic;
pub mod config;
pub mod factory;
mod http;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use config::{ProviderConfig, ProviderKind, RuntimeSettings};
pub use factory::create_provider;
pub use openai::OpenAiProvider;

// Re-export core types for convenience
pub use agent_core::{Agent, AgentBuilder, AgentError, LlmProvider, Result, ToolRegistry};
