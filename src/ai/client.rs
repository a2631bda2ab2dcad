//! OpenRouter API client

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Body of a chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

/// Token accounting reported by the provider. Unknown fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A successful completion
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    provider: Option<String>,
    usage: Option<Usage>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<Value>,
    message: Option<String>,
}

impl ErrorBody {
    /// OpenRouter sends the code as a number, some providers as a string
    fn numeric_code(&self) -> Option<u16> {
        match self.code.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("OpenRouter API error ({status}): {message}")]
    Status {
        status: StatusCode,
        /// `error.code` from the response body, when present
        code: Option<u16>,
        message: String,
    },
    #[error("Failed to reach OpenRouter: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Failed to parse OpenRouter response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("No response content from AI")]
    Empty,
}

impl UpstreamError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            UpstreamError::Status { status, code, .. }
                if *status == StatusCode::TOO_MANY_REQUESTS || *code == Some(429)
        )
    }

    pub fn is_payment_required(&self) -> bool {
        self.status() == Some(StatusCode::PAYMENT_REQUIRED)
    }

    /// Worth another attempt: connection failures and provider-side 5xx.
    /// Timeouts are not retried; they already took the full budget. Neither is
    /// anything carrying a 429 code, whatever the HTTP status.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Transport(e) => !e.is_timeout(),
            UpstreamError::Status { status, code, .. } => {
                status.is_server_error() && *code != Some(429)
            }
            _ => false,
        }
    }
}

/// OpenRouter API client for chat completions
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    endpoint: String,
    referer: String,
    title: String,
}

impl OpenRouterClient {
    pub fn new(
        api_key: &str,
        endpoint: &str,
        referer: &str,
        title: &str,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            referer: referer.to_string(),
            title: title.to_string(),
        })
    }

    /// Send a chat completion request
    pub async fn complete(&self, request: &ChatRequest) -> Result<Completion, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(request)
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ErrorEnvelope>(&text).ok();
            return Err(UpstreamError::Status {
                status,
                code: body.as_ref().and_then(|b| b.error.numeric_code()),
                message: body
                    .and_then(|b| b.error.message)
                    .unwrap_or(text),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(UpstreamError::Decode)?;

        // Some provider failures arrive as 200 with an error object and no choices
        if chat_response.choices.is_empty()
            && let Some(error) = chat_response.error
        {
            let code = error.numeric_code();
            return Err(UpstreamError::Status {
                status: code
                    .and_then(|c| StatusCode::from_u16(c).ok())
                    .filter(|s| !s.is_success())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                code,
                message: error.message.unwrap_or_default(),
            });
        }

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(UpstreamError::Empty)?;

        Ok(Completion {
            content,
            model: chat_response.model,
            provider: chat_response.provider,
            usage: chat_response.usage,
        })
    }
}
