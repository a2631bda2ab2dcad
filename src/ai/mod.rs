//! AI chat proxy
//!
//! Answers portfolio questions through the OpenRouter API:
//! - Greetings are answered locally
//! - Other messages go upstream with a system prompt built from the portfolio
//! - Upstream failures map to typed errors, with canned fallback text when credits run out

pub(crate) mod client;
pub(crate) mod fallback;
mod prompts;
mod service;

pub use service::{ChatError, ChatInput, ChatReply, ChatService};
