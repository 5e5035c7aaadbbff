//! `/api/sessions`: interview session lifecycle.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::ApiJson;
use crate::{
    auth::RequireAuth,
    jobs::DispatchedEvent,
    server::{error::ApiError, state::AppState},
    store::{Difficulty, Session, SessionStatus},
};

pub const SESSION_ENDED: &str = "session/ended";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/active", get(active_sessions))
        .route("/:id", get(get_session))
        .route("/:id/end", post(end_session))
}

#[derive(Debug, Deserialize)]
pub struct CreateSession {
    pub problem: String,
    pub difficulty: Difficulty,
}

/// `POST /api/sessions`
pub async fn create_session(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiJson(req): ApiJson<CreateSession>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let problem = req.problem.trim();
    if problem.is_empty() {
        return Err(ApiError::BadRequest("problem is required".into()));
    }
    let session = Session::new(problem.to_owned(), req.difficulty, caller.subject_id);
    state.store.insert_session(session.clone()).await?;
    info!(session_id = %session.id, "session created");
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /api/sessions/active` — newest first.
pub async fn active_sessions(
    State(state): State<AppState>,
    RequireAuth(_): RequireAuth,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(state.store.active_sessions().await?))
}

/// `GET /api/sessions/:id`
pub async fn get_session(
    State(state): State<AppState>,
    RequireAuth(_): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    state
        .store
        .find_session(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))
}

/// `POST /api/sessions/:id/end` — host only.
///
/// The session is completed before `session/ended` is dispatched. A failed
/// dispatch is logged and does not undo or fail the request.
pub async fn end_session(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let mut session = state
        .store
        .find_session(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))?;

    if session.host_id != caller.subject_id {
        return Err(ApiError::Forbidden("only the host can end a session".into()));
    }
    if session.status == SessionStatus::Completed || !state.store.complete_session(&id).await? {
        return Err(ApiError::BadRequest("session is already completed".into()));
    }
    session.status = SessionStatus::Completed;

    let dispatched = DispatchedEvent::new(
        SESSION_ENDED,
        json!({ "session_id": session.id, "host_id": session.host_id }),
    )
    .map(|e| e.with_idempotency_key(format!("session-ended-{}", session.id)));
    match dispatched {
        Ok(event) => {
            if let Err(e) = state.bus.submit(&event).await {
                warn!(session_id = %session.id, error = %e, "session/ended dispatch failed");
            }
        }
        Err(e) => warn!(error = %e, "session/ended payload not serialisable"),
    }

    Ok(Json(session))
}
