//! JSON error responses

use axum::Json;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::ai::ChatError;
use crate::config::Environment;
use crate::mail::ContactError;

/// An error already rendered to status + JSON body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `{"error": message}`
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, json!({ "error": message.into() }))
    }

    pub fn not_found() -> Self {
        Self::message(StatusCode::NOT_FOUND, "Endpoint not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    /// Unexpected failure; the cause is only shown outside production
    pub fn internal(error: &anyhow::Error, environment: Environment) -> Self {
        let message = match environment {
            Environment::Production => "Internal server error".to_string(),
            Environment::Development => format!("{:#}", error),
        };
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "error": message }),
        )
    }

    pub fn chat(error: ChatError, environment: Environment) -> Self {
        let summary = error.to_string();
        match error {
            ChatError::EmptyMessage => Self::message(StatusCode::BAD_REQUEST, summary),
            ChatError::NotConfigured => {
                Self::message(StatusCode::INTERNAL_SERVER_ERROR, summary)
            }
            ChatError::Auth(_) => Self::new(
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "error": summary,
                    "details": "OPENROUTER_API_KEY is invalid or not configured.",
                    "code": "AUTH_ERROR",
                }),
            ),
            ChatError::RateLimited(_) => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "success": false,
                    "error": summary,
                    "details": "The AI service is temporarily rate-limited. Please wait 1-2 minutes and try again.",
                    "code": "RATE_LIMIT",
                }),
            ),
            ChatError::CreditsExhausted { fallback, .. } => {
                let fallback = *fallback;
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({
                        "success": false,
                        "error": summary,
                        "message": fallback.message,
                        "details": "The AI service requires credits to operate, but I can still share profile information in the meantime!",
                        "code": "CREDITS_EXHAUSTED",
                        "source": "Smart Portfolio Assistant",
                        "fallback": true,
                        "metadata": fallback.metadata,
                    }),
                )
            }
            ChatError::Upstream(source) => {
                let details = match environment {
                    Environment::Development => source.to_string(),
                    Environment::Production => {
                        "An error occurred while processing your request".to_string()
                    }
                };
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "error": summary,
                        "details": details,
                        "code": "INTERNAL_ERROR",
                    }),
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::message(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::message(rejection.status(), rejection.body_text())
    }
}

impl From<ContactError> for ApiError {
    fn from(error: ContactError) -> Self {
        Self::message(StatusCode::BAD_REQUEST, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::UpstreamError;
    use crate::ai::fallback::{Fallback, FallbackMetadata};

    fn upstream_error(status: u16, code: Option<u16>) -> UpstreamError {
        UpstreamError::Status {
            status: reqwest::StatusCode::from_u16(status).unwrap(),
            code,
            message: "Provider returned error".to_string(),
        }
    }

    #[test]
    fn test_internal_hides_cause_in_production() {
        let error = anyhow::anyhow!("smtp relay refused").context("Failed to send email");

        let prod = ApiError::internal(&error, Environment::Production);
        assert_eq!(prod.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(prod.body["error"], "Internal server error");

        let dev = ApiError::internal(&error, Environment::Development);
        assert_eq!(dev.body["error"], "Failed to send email: smtp relay refused");
    }

    #[test]
    fn test_contact_errors_are_bad_requests() {
        let error = ApiError::from(ContactError::InvalidEmail);
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.body, json!({ "error": "Invalid email address" }));
    }

    #[test]
    fn test_simple_chat_errors() {
        let empty = ApiError::chat(ChatError::EmptyMessage, Environment::Production);
        assert_eq!(empty.status, StatusCode::BAD_REQUEST);
        assert_eq!(empty.body, json!({ "error": "Message cannot be empty" }));

        let unconfigured = ApiError::chat(ChatError::NotConfigured, Environment::Production);
        assert_eq!(unconfigured.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unconfigured.body, json!({ "error": "AI service not configured" }));
    }

    #[test]
    fn test_auth_error_shape() {
        for environment in [Environment::Production, Environment::Development] {
            let error = ApiError::chat(ChatError::Auth(upstream_error(401, None)), environment);
            assert_eq!(error.status, StatusCode::UNAUTHORIZED);
            assert_eq!(
                error.body,
                json!({
                    "success": false,
                    "error": "Authentication failed",
                    "details": "OPENROUTER_API_KEY is invalid or not configured.",
                    "code": "AUTH_ERROR",
                })
            );
        }
    }

    #[test]
    fn test_rate_limit_shape() {
        for environment in [Environment::Production, Environment::Development] {
            let error =
                ApiError::chat(ChatError::RateLimited(upstream_error(429, None)), environment);
            assert_eq!(error.status, StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(
                error.body,
                json!({
                    "success": false,
                    "error": "Rate limit exceeded",
                    "details": "The AI service is temporarily rate-limited. Please wait 1-2 minutes and try again.",
                    "code": "RATE_LIMIT",
                })
            );
        }
    }

    #[test]
    fn test_credits_exhausted_shape() {
        let credits_exhausted = || ChatError::CreditsExhausted {
            fallback: Box::new(Fallback {
                message: "Here's an overview of Ada's professional background.".to_string(),
                metadata: FallbackMetadata {
                    category: "portfolio_overview",
                    fallback: true,
                    highlights: Some(vec!["experience", "background"]),
                    helpful_info: None,
                    timestamp: "2025-01-02T03:04:05.000Z".to_string(),
                },
            }),
            source: upstream_error(402, Some(402)),
        };

        for environment in [Environment::Production, Environment::Development] {
            let error = ApiError::chat(credits_exhausted(), environment);
            assert_eq!(error.status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(
                error.body,
                json!({
                    "success": false,
                    "error": "AI Service Temporarily Unavailable",
                    "message": "Here's an overview of Ada's professional background.",
                    "details": "The AI service requires credits to operate, but I can still share profile information in the meantime!",
                    "code": "CREDITS_EXHAUSTED",
                    "source": "Smart Portfolio Assistant",
                    "fallback": true,
                    "metadata": {
                        "category": "portfolio_overview",
                        "fallback": true,
                        "highlights": ["experience", "background"],
                        "timestamp": "2025-01-02T03:04:05.000Z",
                    },
                })
            );
        }
    }

    #[test]
    fn test_upstream_failure_details_depend_on_environment() {
        let prod = ApiError::chat(
            ChatError::Upstream(upstream_error(500, None)),
            Environment::Production,
        );
        assert_eq!(prod.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            prod.body,
            json!({
                "success": false,
                "error": "Failed to get AI response",
                "details": "An error occurred while processing your request",
                "code": "INTERNAL_ERROR",
            })
        );

        let dev = ApiError::chat(
            ChatError::Upstream(upstream_error(500, None)),
            Environment::Development,
        );
        assert_eq!(dev.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            dev.body,
            json!({
                "success": false,
                "error": "Failed to get AI response",
                "details": "OpenRouter API error (500 Internal Server Error): Provider returned error",
                "code": "INTERNAL_ERROR",
            })
        );
    }
}
