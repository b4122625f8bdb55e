use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use teloxide::types::{Update, UpdateKind};

use crate::message::Relay;

pub static SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
struct WebhookState {
    relay: Arc<Relay>,
    secret: Option<Arc<str>>,
}

pub fn router(relay: Arc<Relay>, secret: Option<String>) -> Router {
    let state = WebhookState {
        relay,
        secret: secret.map(Into::into),
    };
    Router::new()
        .route("/", get(home))
        .route("/webhook", post(telegram_webhook))
        .with_state(state)
}

async fn home() -> &'static str {
    "Terabox Telegram Bot is running!"
}

async fn telegram_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(secret.as_ref()) {
            tracing::warn!("webhook called without a valid secret token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }

    if !is_json(&headers) {
        tracing::warn!("webhook received non-JSON request");
        return (
            StatusCode::BAD_REQUEST,
            "Bad Request: Content-Type must be application/json",
        )
            .into_response();
    }

    match serde_json::from_slice::<Value>(&body) {
        Ok(payload) if !is_empty(&payload) => {}
        _ => {
            tracing::warn!("webhook received empty JSON or failed to parse");
            return (
                StatusCode::BAD_REQUEST,
                "Bad Request: Empty or invalid JSON payload",
            )
                .into_response();
        }
    };

    // teloxide only recognises update kinds when decoding from raw bytes
    let update = match serde_json::from_slice::<Update>(&body) {
        Ok(update) if !matches!(update.kind, UpdateKind::Error(_)) => update,
        Ok(update) => {
            tracing::error!(update_id = update.id.0, "unrecognised update shape");
            return parse_failure();
        }
        Err(e) => {
            tracing::error!("failed to deserialize update: {e}");
            return parse_failure();
        }
    };

    let relay = state.relay.clone();
    tokio::spawn(async move { relay.dispatch_update(&update).await });
    Json(json!({"status": "ok"})).into_response()
}

fn parse_failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error: Failed to parse Telegram update",
    )
        .into_response()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

fn is_empty(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
