//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Tool failures never surface as `AgentError` outside the registry: the
/// registry folds them into a failed `ToolResult`. Everything else here is
/// fatal to the current run.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider rejected the request
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unreachable, timed out, or returned a 5xx
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool input did not match the tool's parameter shape
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Conversation would violate the tool-call/tool-result pairing
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Parse error (e.g., provider response body)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error (unknown provider, missing credential, bad limits)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable by starting a new run
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited(_) | Self::Io(_)
        )
    }

    /// Setup mistakes that abort before any round executes
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Auth(_))
    }

    /// Whether the error originated at the model provider boundary
    pub const fn is_provider(&self) -> bool {
        matches!(
            self,
            Self::Provider(_)
                | Self::ProviderUnavailable(_)
                | Self::RateLimited(_)
                | Self::Auth(_)
                | Self::Parse(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            Self::Parse(_) => "The AI service returned a response that could not be read.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
