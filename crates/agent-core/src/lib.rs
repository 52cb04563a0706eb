//! # agent-core
//!
//! Core agent logic: the tool registry, the canonical conversation model,
//! the provider-agnostic LLM contract and the ReAct decision loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Decision   │  │    Tools    │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between Anthropic, OpenAI,
//! Ollama, or any other provider without changing agent logic. Concrete
//! providers live in `agent-runtime`; concrete tools in `agent-tools`.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role, TextBlock, ToolCall, ToolResultEntry};
pub use provider::{ChatRequest, ChatResponse, GenerationOptions, LlmProvider, TokenUsage};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, RunOutcome, RunResult, ToolInvocation};
pub use tool::{
    ParameterSchema, Tool, ToolContent, ToolDefinition, ToolRegistry, ToolResult, ToolSchema,
    parse_input,
};
