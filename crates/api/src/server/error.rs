//! Request-level errors and their HTTP translation.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, ServiceError};
use thiserror::Error;
use tracing::{error, warn};

use crate::{jobs::DispatchError, store::StoreError};

/// Errors a route handler may return. Always recovered into a structured
/// JSON response; never crash the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// A JSON body the extractor refused; carries axum's own status.
    #[error(transparent)]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Client-facing form. Store and bus details stay in the logs.
    fn to_service_error(&self) -> ServiceError {
        match self {
            ApiError::Unauthorized => ServiceError::Unauthorized,
            ApiError::Forbidden(m) => ServiceError::Forbidden(m.clone()),
            ApiError::NotFound(m) => ServiceError::NotFound(m.clone()),
            ApiError::BadRequest(m) => ServiceError::BadRequest(m.clone()),
            ApiError::Body(rejection) => {
                let message = rejection.body_text();
                match rejection.status() {
                    StatusCode::PAYLOAD_TOO_LARGE => ServiceError::PayloadTooLarge(message),
                    StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                        ServiceError::UnsupportedMediaType(message)
                    }
                    StatusCode::UNPROCESSABLE_ENTITY => ServiceError::Unprocessable(message),
                    _ => ServiceError::BadRequest(message),
                }
            }
            ApiError::Dispatch(DispatchError::Unreachable(_)) => {
                ServiceError::Unavailable("job bus unreachable".into())
            }
            ApiError::Dispatch(_) => ServiceError::BadGateway("job bus rejected the event".into()),
            ApiError::Store(_) => ServiceError::Internal("store operation failed".into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(e) => error!(error = %e, "store error"),
            ApiError::Dispatch(e) => warn!(error = %e, "dispatch failed"),
            _ => {}
        }
        let svc = self.to_service_error();
        let status =
            StatusCode::from_u16(svc.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&svc))).into_response()
    }
}
