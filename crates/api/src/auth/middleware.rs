//! Identity middleware: attaches an [`IdentityClaim`] to every request.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::{claim::IdentityClaim, verifier::TokenVerifier};

/// Cookie the identity provider's frontend SDK stores the session token in.
const SESSION_COOKIE: &str = "__session";

/// Shared handle to the optional token verifier.
#[derive(Clone, Default)]
pub struct Authenticator {
    verifier: Option<Arc<TokenVerifier>>,
}

impl Authenticator {
    pub fn new(verifier: Option<TokenVerifier>) -> Self {
        Self {
            verifier: verifier.map(Arc::new),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    /// Resolve the identity for a set of request headers. Never fails: any
    /// missing or invalid token yields [`IdentityClaim::Anonymous`].
    pub fn identify(&self, headers: &HeaderMap) -> IdentityClaim {
        let (Some(verifier), Some(token)) = (&self.verifier, extract_token(headers)) else {
            return IdentityClaim::Anonymous;
        };
        match verifier.verify(token) {
            Ok(principal) => IdentityClaim::Authenticated(principal),
            Err(e) => {
                debug!(error = %e, "identity token rejected; continuing as anonymous");
                IdentityClaim::Anonymous
            }
        }
    }
}

/// Axum middleware attaching the caller's [`IdentityClaim`] to the request
/// extensions. Authentication only: it never rejects a request.
pub async fn attach_identity(
    State(auth): State<Authenticator>,
    mut req: Request,
    next: Next,
) -> Response {
    let claim = auth.identify(req.headers());
    if let Some(principal) = claim.principal() {
        debug!(subject = %principal.subject_id, "request authenticated");
    }
    req.extensions_mut().insert(claim);
    next.run(req).await
}

/// Bearer token from `Authorization`, falling back to the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if token.is_some() {
            return token;
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}
