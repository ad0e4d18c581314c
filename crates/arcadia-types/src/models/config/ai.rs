//! LLM assistant settings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    #[default]
    Groq,
    OpenAi,
    Anthropic,
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiProvider::Groq => write!(f, "groq"),
            AiProvider::OpenAi => write!(f, "openai"),
            AiProvider::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl AiProvider {
    /// Parse from string, falling back to Groq.
    pub fn from_string(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => AiProvider::OpenAi,
            "anthropic" => AiProvider::Anthropic,
            _ => AiProvider::Groq,
        }
    }

    /// Environment variable holding this provider's key.
    pub fn key_variable(&self) -> &'static str {
        match self {
            AiProvider::Groq => "GROQ_API_KEY",
            AiProvider::OpenAi => "OPENAI_API_KEY",
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::Groq => "llama-3.1-8b-instant",
            AiProvider::OpenAi => "gpt-4o-mini",
            AiProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

/// Assistant configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: AiProvider,
    /// Optional model override
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self { enabled: true, provider: AiProvider::Groq, model: None, api_key: None }
    }
}

impl AiConfig {
    pub fn effective_model(&self) -> &str {
        self.model.as_deref().filter(|m| !m.is_empty()).unwrap_or(self.provider.default_model())
    }

    /// Enabled and holding a key.
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}
