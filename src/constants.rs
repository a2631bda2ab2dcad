//! Application-wide constants for request handling and upstream defaults
//!
//! Centralizes magic numbers so handlers and config defaults agree.

/// Number of most recent history entries forwarded upstream.
/// Older turns are dropped to keep the prompt small.
pub const MAX_HISTORY: usize = 6;

/// Maximum length of a chat message in characters; longer input is cut.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Maximum accepted request body size in bytes (10 MiB).
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default public URL of the frontend, sent as HTTP-Referer upstream.
pub const DEFAULT_FRONTEND_URL: &str = "https://oladayo.vercel.app";

// === Upstream (OpenRouter) ===

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "z-ai/glm-4.5-air:free";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_MAX_TOKENS: u32 = 2000;

pub const TOP_P: f32 = 0.95;

pub const TOP_K: u32 = 40;

pub const FREQUENCY_PENALTY: f32 = 0.5;

pub const PRESENCE_PENALTY: f32 = 0.1;

/// Upstream request timeout in seconds.
pub const UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Title reported to OpenRouter in the X-Title header.
pub const UPSTREAM_TITLE: &str = "Oladayo Portfolio AI Assistant";

// === Mail ===

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";

pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Retries for a failed SMTP send before the request errors out.
pub const SMTP_MAX_RETRIES: u32 = 2;
