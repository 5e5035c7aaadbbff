//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Unauthorized`] → 401
/// - [`ServiceError::Forbidden`] → 403
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::PayloadTooLarge`] → 413
/// - [`ServiceError::UnsupportedMediaType`] → 415
/// - [`ServiceError::Unprocessable`] → 422
/// - [`ServiceError::Internal`] → 500
/// - [`ServiceError::BadGateway`] → 502
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: invalid body, missing field, bad parameter.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The route requires an authenticated identity and none was attached.
    #[error("unauthorized")]
    Unauthorized,

    /// The caller is authenticated but may not act on the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No route or resource matched the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body exceeded the configured limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The body parsed but did not match the expected shape.
    #[error("unprocessable entity: {0}")]
    Unprocessable(String),

    /// An upstream dependency (the job bus) rejected the request.
    #[error("bad gateway: {0}")]
    BadGateway(String),

    /// An upstream dependency is unreachable or not ready.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Unauthorized => 401,
            ServiceError::Forbidden(_) => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::PayloadTooLarge(_) => 413,
            ServiceError::UnsupportedMediaType(_) => 415,
            ServiceError::Unprocessable(_) => 422,
            ServiceError::Internal(_) => 500,
            ServiceError::BadGateway(_) => 502,
            ServiceError::Unavailable(_) => 503,
        }
    }

    /// Short machine-readable code placed in the `code` field of an error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::PayloadTooLarge(_) => "payload_too_large",
            ServiceError::UnsupportedMediaType(_) => "unsupported_media_type",
            ServiceError::Unprocessable(_) => "unprocessable_entity",
            ServiceError::Internal(_) => "internal_error",
            ServiceError::BadGateway(_) => "upstream_rejected",
            ServiceError::Unavailable(_) => "service_unavailable",
        }
    }
}
