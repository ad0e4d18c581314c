//! Chat assistant over an LLM provider.
//!
//! Groq and OpenAI speak the OpenAI chat-completions dialect; Anthropic has its own
//! messages API. Both go through the same [`GuardedCall`] as every other provider.

use std::collections::VecDeque;
use std::time::Duration;

use arcadia_types::{AiConfig, AiProvider, ApiError, ConfigError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{json, Value};
use tracing::debug;

use super::require;
use crate::error::AppResult;
use crate::reliability::GuardedCall;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.7;
/// Longest message body shown in a formatted context line.
const CONTEXT_LINE_CHARS: usize = 200;

pub const DEFAULT_CONTEXT_MESSAGES: usize = 50;
pub const DEFAULT_CONTEXT_AGE: Duration = Duration::from_secs(24 * 60 * 60);

fn base_url(provider: AiProvider) -> &'static str {
    match provider {
        AiProvider::Groq => GROQ_API_URL,
        AiProvider::OpenAi => OPENAI_API_URL,
        AiProvider::Anthropic => ANTHROPIC_API_URL,
    }
}

fn provider_name(provider: AiProvider) -> &'static str {
    match provider {
        AiProvider::Groq => "groq",
        AiProvider::OpenAi => "openai",
        AiProvider::Anthropic => "anthropic",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Recent messages of one channel, bounded by count and age.
#[derive(Debug, Clone)]
pub struct ChatContext {
    max_messages: usize,
    max_age: Duration,
    messages: VecDeque<ChatMessage>,
}

impl Default for ChatContext {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_MESSAGES, DEFAULT_CONTEXT_AGE)
    }
}

impl ChatContext {
    pub fn new(max_messages: usize, max_age: Duration) -> Self {
        Self { max_messages: max_messages.max(1), max_age, messages: VecDeque::new() }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Record a message, dropping ones older than the age limit and the oldest
    /// beyond the count limit.
    pub fn add_message(&mut self, author: impl Into<String>, content: impl Into<String>, timestamp: DateTime<Utc>) {
        let cutoff = chrono::Duration::from_std(self.max_age).ok().and_then(|age| Utc::now().checked_sub_signed(age));
        if let Some(cutoff) = cutoff {
            self.messages.retain(|m| m.timestamp > cutoff);
        }

        self.messages.push_back(ChatMessage { author: author.into(), content: content.into(), timestamp });
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// Up to `limit` newest messages, oldest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().skip(self.messages.len().saturating_sub(limit))
    }

    /// `[HH:MM] author: content` lines for the prompt.
    pub fn format(&self, limit: usize) -> String {
        if self.messages.is_empty() {
            return "No recent messages in this channel.".to_string();
        }
        self.recent(limit)
            .map(|m| {
                let content: String = m.content.chars().take(CONTEXT_LINE_CHARS).collect();
                format!("[{}] {}: {}", m.timestamp.format("%H:%M"), m.author, content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One [`ChatContext`] per channel.
#[derive(Debug, Default)]
pub struct ChatContexts {
    channels: DashMap<u64, ChatContext>,
}

impl ChatContexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, channel_id: u64, author: &str, content: &str, timestamp: DateTime<Utc>) {
        self.channels.entry(channel_id).or_default().add_message(author, content, timestamp);
    }

    pub fn format(&self, channel_id: u64, limit: usize) -> String {
        self.channels
            .get(&channel_id)
            .map_or_else(|| ChatContext::default().format(limit), |ctx| ctx.format(limit))
    }

    pub fn clear(&self, channel_id: u64) {
        self.channels.remove(&channel_id);
    }
}

/// Where a question is being asked.
#[derive(Debug, Clone, Copy)]
pub struct AskScope<'a> {
    pub channel: &'a str,
    pub server: &'a str,
}

impl Default for AskScope<'_> {
    fn default() -> Self {
        Self { channel: "general", server: "Discord Server" }
    }
}

fn system_prompt(scope: AskScope<'_>, context: &str) -> String {
    format!(
        "You are a helpful AI assistant in a Discord server called \"{server}\".\n\
         You can see recent messages from the #{channel} channel and answer questions about \
         what's happening in the conversation.\n\n\
         Your role:\n\
         - Answer questions about recent chat activity\n\
         - Summarize what people are discussing\n\
         - Help users understand context they might have missed\n\
         - Be concise and friendly\n\
         - If you don't have enough context, say so\n\n\
         Recent chat context:\n{context}\n\n\
         Answer the user's question based on the context above. Be helpful and concise.",
        server = scope.server,
        channel = scope.channel,
    )
}

/// LLM chat client for the configured provider.
#[derive(Clone)]
pub struct AiClient {
    enabled: bool,
    provider: AiProvider,
    model: String,
    api_key: Option<String>,
    base_url: String,
    call: GuardedCall,
}

impl AiClient {
    pub fn from_config(config: &AiConfig, call: GuardedCall) -> Self {
        Self {
            enabled: config.enabled,
            provider: config.provider,
            model: config.effective_model().to_string(),
            api_key: config.api_key.clone(),
            base_url: base_url(config.provider).to_string(),
            call,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn provider(&self) -> AiProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_configured(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Answer `question` using the formatted channel `context`.
    pub async fn ask_question(&self, question: &str, context: &str, scope: AskScope<'_>) -> AppResult<String> {
        if !self.enabled {
            return Err(ConfigError::invalid("ai.enabled", "assistant is disabled").into());
        }
        let key = require(self.api_key.as_deref(), provider_name(self.provider), self.provider.key_variable())?;
        let system = system_prompt(scope, context);
        debug!(provider = %self.provider, model = %self.model, "Asking assistant");

        let answer = match self.provider {
            AiProvider::Anthropic => self.call_anthropic(key, &system, question).await?,
            AiProvider::Groq | AiProvider::OpenAi => self.call_openai_compatible(key, &system, question).await?,
        };
        Ok(answer.trim().to_string())
    }

    async fn call_openai_compatible(&self, key: &str, system: &str, question: &str) -> AppResult<String> {
        let provider = provider_name(self.provider);
        let url = format!("{}/chat/completions", self.base_url);
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": question},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });
        let http = self.call.http();

        let body: Value = self
            .call
            .run(|client| {
                let request = client.post(&url).bearer_auth(key).json(&payload);
                http.fetch_json(provider, request)
            })
            .await?;
        text_at(provider, &body, "/choices/0/message/content")
    }

    async fn call_anthropic(&self, key: &str, system: &str, question: &str) -> AppResult<String> {
        let provider = provider_name(self.provider);
        let url = format!("{}/messages", self.base_url);
        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": [{"role": "user", "content": question}],
        });
        let http = self.call.http();

        let body: Value = self
            .call
            .run(|client| {
                let request = client
                    .post(&url)
                    .header("x-api-key", key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&payload);
                http.fetch_json(provider, request)
            })
            .await?;
        text_at(provider, &body, "/content/0/text")
    }
}

fn text_at(provider: &str, body: &Value, pointer: &str) -> AppResult<String> {
    body.pointer(pointer).and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
        ApiError::InvalidResponse { provider: provider.to_string(), message: format!("missing {pointer}") }.into()
    })
}
