//! Local heuristics: greeting detection, smart fallback text and reply cleanup

use aho_corasick::{AhoCorasick, BuildError, MatchKind};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::prompts;
use crate::portfolio::Portfolio;

/// Canned answer served when the upstream model is unavailable
#[derive(Debug, Clone, Serialize)]
pub struct Fallback {
    pub message: String,
    pub metadata: FallbackMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct FallbackMetadata {
    pub category: &'static str,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helpful_info: Option<bool>,
    pub timestamp: String,
}

/// True for short salutations that need no model round trip
pub fn is_greeting(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    if prompts::GREETINGS.contains(&lower.as_str()) {
        return true;
    }

    ["hello", "hi"].iter().any(|word| {
        lower.strip_prefix(word).is_some_and(|rest| {
            rest.chars()
                .all(|c| c.is_whitespace() || matches!(c, '!' | '.' | ','))
        })
    })
}

/// Pre-built matchers for the keyword heuristics
pub struct Fallbacks {
    overview_keywords: AhoCorasick,
    boilerplate: AhoCorasick,
}

impl Fallbacks {
    pub fn new(portfolio: &Portfolio) -> Result<Self, BuildError> {
        let overview_keywords = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(prompts::OVERVIEW_KEYWORDS)?;
        let boilerplate = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(prompts::boilerplate_phrases(portfolio))?;

        Ok(Self {
            overview_keywords,
            boilerplate,
        })
    }

    /// Pick a canned answer for `message`
    pub fn smart_fallback(&self, portfolio: &Portfolio, message: &str) -> Fallback {
        self.smart_fallback_at(portfolio, message, Utc::now())
    }

    fn smart_fallback_at(
        &self,
        portfolio: &Portfolio,
        message: &str,
        now: DateTime<Utc>,
    ) -> Fallback {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        if self.overview_keywords.is_match(message) {
            Fallback {
                message: prompts::overview(portfolio),
                metadata: FallbackMetadata {
                    category: "portfolio_overview",
                    fallback: true,
                    highlights: Some(vec!["experience", "background"]),
                    helpful_info: None,
                    timestamp,
                },
            }
        } else {
            Fallback {
                message: prompts::introduction(portfolio),
                metadata: FallbackMetadata {
                    category: "general_introduction",
                    fallback: true,
                    highlights: None,
                    helpful_info: Some(true),
                    timestamp,
                },
            }
        }
    }

    /// Trim `text` and cut everything from the first closing boilerplate phrase on
    pub fn sanitize(&self, text: &str) -> String {
        let trimmed = text.trim();
        match self.boilerplate.find(trimmed) {
            Some(m) => trimmed[..m.start()].trim().to_string(),
            None => trimmed.to_string(),
        }
    }
}
