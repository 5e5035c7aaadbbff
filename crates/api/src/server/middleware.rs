//! Axum middleware layers applied to the router.
//!
//! Request tracing, timeout, compression and body limits come from
//! `tower-http`; the cross-origin policy is built here from configuration.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Client-supplied dedup key for chat dispatch.
pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

/// Cross-origin policy admitting exactly `client_url`, with credentials.
///
/// Requests from any other origin receive no `Access-Control-Allow-Origin`
/// header, so browsers refuse the response.
pub fn cors(client_url: &str) -> CorsLayer {
    let allowed = client_url.as_bytes().to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| origin.as_bytes() == allowed.as_slice(),
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, IDEMPOTENCY_KEY])
}
