//! `/api/chat`: message intake with durable fan-out.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::ApiJson;
use crate::{
    auth::{IdentityClaim, RequireAuth},
    jobs::DispatchedEvent,
    server::{error::ApiError, middleware::IDEMPOTENCY_KEY, state::AppState},
    store::ChatMessage,
};

pub const MESSAGE_SENT: &str = "chat/message.sent";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/whoami", get(whoami))
}

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub session_id: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageAccepted {
    pub message: ChatMessage,
    pub event_ids: Vec<String>,
}

/// `POST /api/chat/messages`
///
/// Stores the message, then hands `chat/message.sent` to the job bus and
/// answers `202` without waiting for any job to run. A failed hand-off is
/// reported to the caller; the stored message is kept, and a retry with the
/// same `Idempotency-Key` will not produce a second job run.
pub async fn send_message(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    headers: HeaderMap,
    ApiJson(req): ApiJson<SendMessage>,
) -> Result<(StatusCode, Json<MessageAccepted>), ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("message content is empty".into()));
    }
    if state.store.find_session(&req.session_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("session {}", req.session_id)));
    }

    let message = ChatMessage::new(req.session_id, caller.subject_id, content.to_owned());
    state.store.insert_message(message.clone()).await?;

    let key = headers
        .get(IDEMPOTENCY_KEY)
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.is_empty())
        .map_or_else(|| message.id.clone(), str::to_owned);
    let event = DispatchedEvent::new(
        MESSAGE_SENT,
        json!({
            "message_id": message.id,
            "session_id": message.session_id,
            "sender_id": message.sender_id,
        }),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?
    .with_idempotency_key(key);

    let accepted = state.bus.submit(&event).await?;
    info!(
        message_id = %message.id,
        key = event.idempotency_key().unwrap_or_default(),
        "chat message dispatched"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageAccepted {
            message,
            event_ids: accepted.ids,
        }),
    ))
}

/// `GET /api/chat/whoami` — the caller's identity claim; anonymous allowed.
pub async fn whoami(claim: IdentityClaim) -> Json<IdentityClaim> {
    Json(claim)
}
