//! Chat request handling: greeting shortcut, prompt assembly, upstream call

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::client::{ChatMessage, ChatRequest, Completion, OpenRouterClient, Role, UpstreamError};
use super::fallback::{Fallback, Fallbacks, is_greeting};
use super::prompts;
use crate::config::Config;
use crate::constants::{MAX_HISTORY, MAX_MESSAGE_LENGTH};
use crate::portfolio::Portfolio;
use crate::retry::{RetryConfig, with_retry_if};

/// Incoming chat request as sent by the SPA
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInput {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Successful chat reply
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub success: bool,
    pub message: String,
    pub source: &'static str,
    pub model: String,
    pub provider: String,
    pub metadata: ReplyMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub category: String,
    pub runtime: Value,
    pub tokens: TokenCounts,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct TokenCounts {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("AI service not configured")]
    NotConfigured,
    #[error("Authentication failed")]
    Auth(#[source] UpstreamError),
    #[error("Rate limit exceeded")]
    RateLimited(#[source] UpstreamError),
    #[error("AI Service Temporarily Unavailable")]
    CreditsExhausted {
        fallback: Box<Fallback>,
        #[source]
        source: UpstreamError,
    },
    #[error("Failed to get AI response")]
    Upstream(#[source] UpstreamError),
}

/// Upstream sampling settings resolved from config
#[derive(Debug, Clone)]
struct Sampling {
    model: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    top_k: u32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

pub struct ChatService {
    portfolio: Arc<Portfolio>,
    system_prompt: String,
    client: Option<OpenRouterClient>,
    sampling: Sampling,
    retry: RetryConfig,
    fallbacks: Fallbacks,
}

impl ChatService {
    pub fn new(config: &Config, portfolio: Arc<Portfolio>) -> Result<Self> {
        let client = match config.ai.api_key() {
            Some(api_key) => Some(
                OpenRouterClient::new(
                    api_key,
                    &config.ai.endpoint,
                    &config.server.frontend_url,
                    &config.ai.title,
                    Duration::from_secs(config.ai.timeout_secs),
                )
                .context("Failed to create HTTP client")?,
            ),
            None => {
                tracing::warn!("OPENROUTER_API_KEY not set; chat will only answer greetings");
                None
            }
        };

        let fallbacks = Fallbacks::new(&portfolio).context("Failed to build keyword matchers")?;

        Ok(Self {
            system_prompt: portfolio.system_prompt(),
            portfolio,
            client,
            sampling: Sampling {
                model: config.ai.model.clone(),
                temperature: config.ai.temperature,
                max_tokens: config.ai.max_tokens,
                top_p: config.ai.top_p,
                top_k: config.ai.top_k,
                frequency_penalty: config.ai.frequency_penalty,
                presence_penalty: config.ai.presence_penalty,
            },
            retry: RetryConfig::default().with_max_retries(config.ai.max_retries),
            fallbacks,
        })
    }

    /// Answer one chat turn
    pub async fn chat(&self, input: ChatInput) -> Result<ChatReply, ChatError> {
        let message = input.message.as_deref().map(str::trim).unwrap_or_default();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let message = truncate_chars(message, MAX_MESSAGE_LENGTH);

        if is_greeting(message) {
            tracing::debug!("Answering greeting locally");
            return Ok(self.greeting_reply(input.category));
        }

        let Some(client) = &self.client else {
            return Err(ChatError::NotConfigured);
        };

        let request = self.build_request(message, &input.conversation_history, input.model);
        tracing::debug!(
            model = %request.model,
            history = request.messages.len() - 2,
            "Forwarding chat to OpenRouter"
        );

        let result = with_retry_if(
            &self.retry,
            || client.complete(&request),
            UpstreamError::is_transient,
        )
        .await;

        match result {
            Ok(completion) => Ok(self.completion_reply(completion, request.model, input.category)),
            Err(e) => {
                tracing::error!("Chat error: {}", e);
                Err(self.classify(e, message))
            }
        }
    }

    fn build_request(
        &self,
        message: &str,
        history: &[ChatMessage],
        requested_model: Option<String>,
    ) -> ChatRequest {
        let recent = &history[history.len().saturating_sub(MAX_HISTORY)..];

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(ChatMessage::new(Role::System, self.system_prompt.as_str()));
        messages.extend(recent.iter().cloned());
        messages.push(ChatMessage::new(Role::User, message));

        ChatRequest {
            model: requested_model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.sampling.model.clone()),
            messages,
            temperature: self.sampling.temperature,
            max_tokens: self.sampling.max_tokens,
            top_p: self.sampling.top_p,
            top_k: self.sampling.top_k,
            frequency_penalty: self.sampling.frequency_penalty,
            presence_penalty: self.sampling.presence_penalty,
        }
    }

    fn greeting_reply(&self, category: Option<String>) -> ChatReply {
        ChatReply {
            success: true,
            message: prompts::greeting(&self.portfolio),
            source: "Local responder",
            model: "local-greeting".to_string(),
            provider: "On-device".to_string(),
            metadata: ReplyMetadata {
                timestamp: None,
                category: category.unwrap_or_else(|| "greeting".to_string()),
                runtime: serde_json::json!({
                    "generation_time": 5,
                    "latency": 5,
                    "tokens_per_second": null,
                }),
                tokens: TokenCounts::default(),
            },
        }
    }

    fn completion_reply(
        &self,
        completion: Completion,
        requested_model: String,
        category: Option<String>,
    ) -> ChatReply {
        let tokens = completion
            .usage
            .as_ref()
            .map(|usage| TokenCounts {
                prompt: usage.prompt_tokens,
                completion: usage.completion_tokens,
                total: usage.total_tokens,
            })
            .unwrap_or_default();

        ChatReply {
            success: true,
            message: completion.content,
            source: "OpenRouter AI",
            model: completion.model.unwrap_or(requested_model),
            provider: completion.provider.unwrap_or_else(|| "Unknown".to_string()),
            metadata: ReplyMetadata {
                timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
                category: category.unwrap_or_else(|| "portfolio".to_string()),
                runtime: completion
                    .usage
                    .and_then(|usage| serde_json::to_value(usage).ok())
                    .unwrap_or(Value::Null),
                tokens,
            },
        }
    }

    fn classify(&self, error: UpstreamError, message: &str) -> ChatError {
        if error.is_auth() {
            ChatError::Auth(error)
        } else if error.is_rate_limited() {
            ChatError::RateLimited(error)
        } else if error.is_payment_required() {
            let mut fallback = self.fallbacks.smart_fallback(&self.portfolio, message);
            fallback.message = self.fallbacks.sanitize(&fallback.message);
            ChatError::CreditsExhausted {
                fallback: Box::new(fallback),
                source: error,
            }
        } else {
            ChatError::Upstream(error)
        }
    }
}

/// Cut `text` to at most `max` characters on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
