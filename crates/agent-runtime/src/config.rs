//! Runtime Settings
//!
//! Provider selection and credentials, read from the environment.

use std::fmt;
use std::str::FromStr;

use agent_core::{AgentError, Result};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Closed set of supported provider protocols
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    /// Local Ollama, spoken to through its OpenAI-compatible endpoint
    Ollama,
}

impl ProviderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
            Self::Ollama => DEFAULT_OLLAMA_MODEL,
        }
    }

    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" | "openai_compatible" | "openai-compatible" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(AgentError::Config(format!(
                "Unknown provider '{other}' (expected anthropic, openai or ollama)"
            ))),
        }
    }
}

/// Everything needed to build one provider client
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Process-wide runtime settings
#[derive(Clone)]
pub struct RuntimeSettings {
    /// Provider used when a request does not name one
    pub default_provider: ProviderKind,

    /// Model override applied to every provider
    pub model: Option<String>,

    pub max_rounds: usize,
    pub max_tokens: u32,
    pub temperature: f32,

    /// Provider HTTP timeout in seconds
    pub timeout_secs: u64,

    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_host: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_provider: ProviderKind::Anthropic,
            model: None,
            max_rounds: agent_core::reasoning::DEFAULT_MAX_ROUNDS,
            max_tokens: 4096,
            temperature: 0.7,
            timeout_secs: 120,
            anthropic_api_key: None,
            anthropic_base_url: None,
            openai_api_key: None,
            openai_base_url: None,
            ollama_host: DEFAULT_OLLAMA_HOST.into(),
        }
    }
}

impl fmt::Debug for RuntimeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSettings")
            .field("default_provider", &self.default_provider)
            .field("model", &self.model)
            .field("max_rounds", &self.max_rounds)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("anthropic_api_key", &self.anthropic_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("ollama_host", &self.ollama_host)
            .finish_non_exhaustive()
    }
}

impl RuntimeSettings {
    /// Read settings from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let default_provider = match get("AGENT_PROVIDER") {
            Some(name) => name.parse()?,
            None => defaults.default_provider,
        };

        Ok(Self {
            default_provider,
            model: get("AGENT_MODEL"),
            max_rounds: parse_or("AGENT_MAX_ROUNDS", get("AGENT_MAX_ROUNDS"), defaults.max_rounds),
            max_tokens: parse_or("AGENT_MAX_TOKENS", get("AGENT_MAX_TOKENS"), defaults.max_tokens),
            temperature: parse_or(
                "AGENT_TEMPERATURE",
                get("AGENT_TEMPERATURE"),
                defaults.temperature,
            ),
            timeout_secs: parse_or(
                "AGENT_TIMEOUT_SECS",
                get("AGENT_TIMEOUT_SECS"),
                defaults.timeout_secs,
            ),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_base_url: get("ANTHROPIC_BASE_URL"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            ollama_host: get("OLLAMA_HOST").unwrap_or(defaults.ollama_host),
        })
    }

    /// Resolve the client configuration for one provider
    pub fn provider_config(&self, kind: ProviderKind, model: Option<&str>) -> ProviderConfig {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(ToString::to_string)
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| kind.default_model().to_string());

        let (api_key, base_url) = match kind {
            ProviderKind::Anthropic => (
                self.anthropic_api_key.clone(),
                self.anthropic_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.into()),
            ),
            ProviderKind::OpenAi => (
                self.openai_api_key.clone(),
                normalize_openai_base_url(self.openai_base_url.as_deref()),
            ),
            ProviderKind::Ollama => (
                None,
                normalize_openai_base_url(Some(&self.ollama_host)),
            ),
        };

        ProviderConfig {
            kind,
            api_key,
            model,
            base_url,
            timeout_secs: self.timeout_secs,
        }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting, using default");
            default
        }),
    }
}

/// Accept a bare host, a `/v1` base, or a pasted full endpoint
pub fn normalize_openai_base_url(base_url: Option<&str>) -> String {
    let Some(base) = base_url.map(str::trim).filter(|b| !b.is_empty()) else {
        return DEFAULT_OPENAI_URL.to_string();
    };

    let base = base.trim_end_matches('/');
    let base = base.strip_suffix("/chat/completions").unwrap_or(base);

    // Only append /v1 when no path was provided.
    match url::Url::parse(base) {
        Ok(url) if url.path().is_empty() || url.path() == "/" => format!("{base}/v1"),
        _ => base.to_string(),
    }
}
