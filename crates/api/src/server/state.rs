//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::{
    auth::Authenticator,
    config::Config,
    jobs::{FunctionRegistry, JobBus},
    lifecycle::Readiness,
    store::Store,
};

/// Application state shared across all request handlers.
///
/// Every field is `Arc`-backed so Axum can clone the state per request
/// without copying the underlying resources.
#[derive(Clone)]
pub struct AppState {
    /// Immutable process configuration, loaded once at startup.
    pub config: Arc<Config>,
    /// The single store handle opened by the lifecycle controller.
    pub store: Arc<dyn Store>,
    /// Outbound side of the durable job bus.
    pub bus: Arc<dyn JobBus>,
    /// Functions the bus delivers into via the webhook.
    pub functions: Arc<FunctionRegistry>,
    pub authenticator: Authenticator,
    pub readiness: Readiness,
}
