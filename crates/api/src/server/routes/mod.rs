//! Business route groups. Each handler receives the request's identity claim
//! and the shared store handle through [`AppState`](super::state::AppState).

pub mod chat;
pub mod sessions;

use axum::extract::FromRequest;

use super::error::ApiError;

/// `Json` extractor whose rejection is a structured [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
