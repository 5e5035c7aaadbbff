//! Axum handlers for the service's own endpoints.

use std::path::Path;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use super::state::AppState;

/// `GET /health` — liveness probe.
///
/// Returns the fixed `200 {"status":"ok","state":"ready"}` once the lifecycle
/// controller has marked the server ready, `503` otherwise. Touches neither
/// the store nor the identity claim.
pub async fn health(State(state): State<AppState>) -> Response {
    let current = state.readiness.state();
    let (code, status) = if state.readiness.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    let body = HealthResponse {
        status: status.into(),
        state: current.as_str().into(),
    };
    (code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Production fallback: static assets from `static_dir`, else the
/// single-page entry document. API paths never fall through to the SPA.
pub async fn spa_fallback(static_dir: &Path, req: Request) -> Response {
    if is_api_path(req.uri().path()) {
        return not_found().await.into_response();
    }

    let service = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(static_dir.join("index.html")));
    match service.oneshot(req).await {
        Ok(resp) => resp.into_response(),
        Err(never) => match never {},
    }
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}
