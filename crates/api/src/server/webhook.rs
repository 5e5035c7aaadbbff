//! `/api/inngest`: the job bus's delivery and registration endpoint.
//!
//! - `GET`  reports what this process serves.
//! - `PUT`  registers the function manifest with the bus.
//! - `POST` runs one function for a delivered event. In production the
//!   request must carry a valid `X-Inngest-Signature`.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use common::protocol::ErrorResponse;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::state::AppState;
use crate::jobs::{
    signature::{self, SignatureError},
    DispatchError, DispatchedEvent, JobError,
};

pub const WEBHOOK_PATH: &str = "/api/inngest";

const SIGNATURE_HEADER: &str = "x-inngest-signature";
const NO_RETRY: HeaderName = HeaderName::from_static("x-inngest-no-retry");

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),

    #[error("missing fnId query parameter")]
    MissingFunction,

    #[error("cannot determine the public URL to register")]
    MissingHost,

    #[error("malformed request body: {0}")]
    Payload(String),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Register(#[from] DispatchError),
}

impl WebhookError {
    fn status(&self) -> StatusCode {
        match self {
            WebhookError::Signature(_) => StatusCode::UNAUTHORIZED,
            WebhookError::MissingFunction | WebhookError::MissingHost => StatusCode::BAD_REQUEST,
            WebhookError::Payload(_) => StatusCode::BAD_REQUEST,
            WebhookError::Job(JobError::UnknownFunction(_)) => StatusCode::NOT_FOUND,
            WebhookError::Job(JobError::InvalidPayload(_)) => StatusCode::BAD_REQUEST,
            WebhookError::Job(JobError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::Register(DispatchError::Unreachable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WebhookError::Register(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::BAD_GATEWAY => "upstream_rejected",
            StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
            _ => "internal_error",
        }
    }

    /// Whether the bus should give up on this delivery.
    fn is_final(&self) -> bool {
        match self {
            WebhookError::Job(e) => !e.is_retriable(),
            WebhookError::Payload(_) | WebhookError::MissingFunction => true,
            _ => false,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            WebhookError::Job(JobError::Store(_)) => "function failed".to_owned(),
            other => other.to_string(),
        };
        warn!(error = %self, status = status.as_u16(), "webhook request failed");
        let no_retry = HeaderValue::from_static(if self.is_final() { "true" } else { "false" });
        (
            status,
            [(NO_RETRY, no_retry)],
            Json(ErrorResponse::new(self.code(), message)),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct Introspection {
    pub function_count: usize,
    pub has_event_key: bool,
    pub has_signing_key: bool,
    pub mode: &'static str,
}

/// `GET /api/inngest`
pub async fn introspect(State(state): State<AppState>) -> Json<Introspection> {
    let cfg = &state.config;
    Json(Introspection {
        function_count: state.functions.len(),
        has_event_key: !cfg.inngest.event_key.is_empty(),
        has_signing_key: cfg.inngest.signing_key.is_some(),
        mode: if cfg.environment.is_production() {
            "cloud"
        } else {
            "dev"
        },
    })
}

/// `PUT /api/inngest`
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, WebhookError> {
    let serve_url = serve_url(&state, &headers).ok_or(WebhookError::MissingHost)?;
    let manifest = state.functions.manifest(&serve_url);
    let outcome = state.bus.register(&manifest).await?;
    info!(url = %serve_url, modified = outcome.modified, "functions registered with job bus");
    Ok(Json(json!({
        "message": "Successfully registered",
        "modified": outcome.modified,
    })))
}

/// Public URL of this endpoint: the configured serve host, else (development
/// only) the request's `Host` header.
fn serve_url(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if let Some(host) = &state.config.inngest.serve_host {
        return Some(format!("{}{WEBHOOK_PATH}", host.trim_end_matches('/')));
    }
    if state.config.environment.is_production() {
        return None;
    }
    let host = headers.get(header::HOST)?.to_str().ok()?;
    Some(format!("http://{host}{WEBHOOK_PATH}"))
}

#[derive(Debug, Deserialize)]
pub struct InvokeQuery {
    #[serde(rename = "fnId")]
    pub fn_id: Option<String>,
    #[serde(rename = "stepId")]
    pub step_id: Option<String>,
}

/// Delivery body. `events` and `ctx` are ignored: every function here is a
/// single step over the triggering event.
#[derive(Debug, Deserialize)]
struct InvokeRequest {
    event: DispatchedEvent,
}

/// `POST /api/inngest?fnId=..&stepId=..`
pub async fn invoke(
    State(state): State<AppState>,
    Query(query): Query<InvokeQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    if state.config.environment.is_production() {
        if let Some(key) = &state.config.inngest.signing_key {
            let sig = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
            signature::verify(sig, &body, key, chrono::Utc::now().timestamp())?;
        }
    }

    let fn_id = query.fn_id.ok_or(WebhookError::MissingFunction)?;
    let request: InvokeRequest =
        serde_json::from_slice(&body).map_err(|e| WebhookError::Payload(e.to_string()))?;

    let output = state.functions.deliver(&fn_id, &request.event).await?;
    info!(
        function = %fn_id,
        step = query.step_id.as_deref().unwrap_or("step"),
        "job function completed"
    );
    Ok(Json(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{dev_config, prod_config, PROD_SIGNING_KEY};
    use crate::jobs::memory::{StubBus, StubMode};
    use crate::server::state::tests::{test_state, test_state_with_bus};
    use crate::store::Store;
    use axum::{routing::get, Router};
    use axum_test::TestServer;
    use std::sync::Arc;

    fn app(state: AppState) -> TestServer {
        let router = Router::new()
            .route(WEBHOOK_PATH, get(introspect).put(register).post(invoke))
            .with_state(state);
        TestServer::new(router).unwrap()
    }

    fn user_created_body() -> String {
        json!({
            "event": {
                "name": "clerk/user.created",
                "data": {
                    "id": "user_9",
                    "email_addresses": [{"email_address": "grace@example.com"}],
                    "first_name": "Grace",
                    "last_name": "Hopper",
                    "image_url": ""
                },
                "ts": 1_700_000_000_000i64
            },
            "events": [],
            "ctx": {"run_id": "01H", "attempt": 0}
        })
        .to_string()
    }

    fn content_json() -> (HeaderName, HeaderValue) {
        (header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    #[tokio::test]
    async fn introspection_reports_functions() {
        let (state, _) = test_state(dev_config());
        let resp = app(state).get(WEBHOOK_PATH).await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["function_count"], 2);
        assert_eq!(body["mode"], "dev");
        assert_eq!(body["has_signing_key"], false);
    }

    #[tokio::test]
    async fn development_delivery_skips_signature() {
        let (state, store) = test_state(dev_config());
        let (name, value) = content_json();
        let resp = app(state)
            .post(WEBHOOK_PATH)
            .add_query_param("fnId", "interview-platform-sync-user")
            .add_query_param("stepId", "step")
            .add_header(name, value)
            .text(user_created_body())
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<Value>()["synced"], "user_9");
        assert!(store.find_user("user_9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn production_rejects_unsigned_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = test_state(prod_config(dir.path()));
        let resp = app(state)
            .post(WEBHOOK_PATH)
            .add_query_param("fnId", "sync-user")
            .text(user_created_body())
            .await;
        resp.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn production_accepts_signed_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = test_state(prod_config(dir.path()));
        let body = user_created_body();
        let sig = signature::sign(
            body.as_bytes(),
            PROD_SIGNING_KEY,
            chrono::Utc::now().timestamp(),
        );
        let resp = app(state)
            .post(WEBHOOK_PATH)
            .add_query_param("fnId", "sync-user")
            .add_header(
                HeaderName::from_static(SIGNATURE_HEADER),
                HeaderValue::from_str(&sig).unwrap(),
            )
            .text(body)
            .await;
        resp.assert_status_ok();
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_function_is_404() {
        let (state, _) = test_state(dev_config());
        let resp = app(state)
            .post(WEBHOOK_PATH)
            .add_query_param("fnId", "does-not-exist")
            .text(user_created_body())
            .await;
        resp.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_is_final() {
        let (state, _) = test_state(dev_config());
        let resp = app(state)
            .post(WEBHOOK_PATH)
            .add_query_param("fnId", "sync-user")
            .text("{not json")
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(resp.header(NO_RETRY), "true");
    }

    #[tokio::test]
    async fn register_publishes_manifest_for_request_host() {
        let bus = Arc::new(StubBus::accepting());
        let (state, _) = test_state_with_bus(dev_config(), bus.clone());
        let resp = app(state)
            .put(WEBHOOK_PATH)
            .add_header(header::HOST, HeaderValue::from_static("localhost:3000"))
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<Value>()["modified"], true);
        assert!(bus
            .registered_urls()
            .contains("http://localhost:3000/api/inngest"));
    }

    #[tokio::test]
    async fn production_registration_ignores_request_host() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(StubBus::accepting());
        let (state, _) = test_state_with_bus(prod_config(dir.path()), bus.clone());
        let resp = app(state)
            .put(WEBHOOK_PATH)
            .add_header(header::HOST, HeaderValue::from_static("evil.example"))
            .await;
        resp.assert_status_ok();
        let urls = bus.registered_urls();
        assert!(urls.iter().all(|u| !u.contains("evil.example")), "{urls:?}");
        assert!(urls.contains("https://api.example.com/api/inngest"));
    }

    #[tokio::test]
    async fn production_without_serve_host_refuses_registration() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = prod_config(dir.path());
        cfg.inngest.serve_host = None;
        let bus = Arc::new(StubBus::accepting());
        let (state, _) = test_state_with_bus(cfg, bus.clone());
        let resp = app(state)
            .put(WEBHOOK_PATH)
            .add_header(header::HOST, HeaderValue::from_static("evil.example"))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert!(bus.registered_urls().is_empty());
    }

    #[tokio::test]
    async fn register_failure_is_bad_gateway() {
        let bus = Arc::new(StubBus::new(StubMode::Reject(401)));
        let (state, _) = test_state_with_bus(dev_config(), bus);
        let resp = app(state)
            .put(WEBHOOK_PATH)
            .add_header(header::HOST, HeaderValue::from_static("localhost:3000"))
            .await;
        resp.assert_status(StatusCode::BAD_GATEWAY);
    }
}
