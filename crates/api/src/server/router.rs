//! Axum router construction.

use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::Request,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{handlers, middleware, routes, state::AppState, webhook};
use crate::auth::attach_identity;

/// Build the application [`Router`] once at startup.
///
/// Request flow, outermost first: tracing, compression, timeout, body limit,
/// CORS, identity, then routes. Production adds the static/SPA fallback,
/// which only sees requests no API route matched.
pub fn build(state: AppState) -> Router {
    let cfg = state.config.clone();

    let api = Router::new()
        .route(
            webhook::WEBHOOK_PATH,
            get(webhook::introspect)
                .put(webhook::register)
                .post(webhook::invoke),
        )
        .nest("/api/chat", routes::chat::routes())
        .nest("/api/sessions", routes::sessions::routes())
        .route("/health", get(handlers::health));

    let app = if cfg.environment.is_production() {
        let static_dir: Arc<PathBuf> = Arc::new(cfg.static_dir.clone());
        api.fallback(move |req: Request| {
            let static_dir = static_dir.clone();
            async move { handlers::spa_fallback(&static_dir, req).await }
        })
    } else {
        api.fallback(handlers::not_found)
    };

    app.layer(from_fn_with_state(
        state.authenticator.clone(),
        attach_identity,
    ))
    .layer(middleware::cors(&cfg.client_url))
    .layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes))
    .layer(TimeoutLayer::new(cfg.request_timeout))
    .layer(CompressionLayer::new())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
