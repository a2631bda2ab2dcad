use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use crate::ai::{ChatInput, ChatReply};
use crate::mail::ContactForm;

/// A body accepted as JSON, or as `application/x-www-form-urlencoded` for plain HTML forms
pub struct JsonOrForm<T>(pub T);

impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "service": "folio",
        "environment": state.environment.as_str(),
    }))
}

pub async fn portfolio(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": &*state.portfolio,
    }))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatInput>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(input) = payload?;
    state
        .chat
        .chat(input)
        .await
        .map(Json)
        .map_err(|e| ApiError::chat(e, state.environment))
}

pub async fn contact(
    State(state): State<AppState>,
    JsonOrForm(form): JsonOrForm<ContactForm>,
) -> Result<Json<Value>, ApiError> {
    let message = form.validate()?;

    if let Err(e) = state.mailer.send(&message).await {
        tracing::error!("Contact error: {:#}", e);
        return Err(ApiError::internal(&e, state.environment));
    }

    let text = if state.mailer.forwards() {
        "Email sent successfully"
    } else {
        "Message sent successfully"
    };
    Ok(Json(json!({ "success": true, "message": text })))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
