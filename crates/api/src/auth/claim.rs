//! Per-request identity claim and the extractors handlers use to read it.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::server::error::ApiError;

/// A verified token subject and the full claim set it carried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub subject_id: String,
    pub claims: Map<String, Value>,
}

/// Identity attached to every request by [`attach_identity`](super::attach_identity).
///
/// Lives in the request extensions for one request only; never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IdentityClaim {
    Authenticated(Principal),
    Anonymous,
}

impl IdentityClaim {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            IdentityClaim::Authenticated(p) => Some(p),
            IdentityClaim::Anonymous => None,
        }
    }
}

/// Reads the claim attached by the middleware. A request that somehow bypassed
/// the middleware is treated as anonymous.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IdentityClaim {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<IdentityClaim>()
            .cloned()
            .unwrap_or(IdentityClaim::Anonymous))
    }
}

/// Extractor for handlers that require an authenticated caller.
///
/// Rejects with `401 Unauthorized` when the attached claim is anonymous.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<IdentityClaim>() {
            Some(IdentityClaim::Authenticated(p)) => Ok(RequireAuth(p.clone())),
            _ => Err(ApiError::Unauthorized),
        }
    }
}
