//! Request and response types exchanged over the public HTTP API.

use serde::{Deserialize, Serialize};

use crate::ServiceError;

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"unauthorized"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` once the server is ready, `"unavailable"` otherwise.
    pub status: String,
    /// Lifecycle state name (`"initializing"`, `"ready"`, `"terminated"`).
    pub state: String,
}

// ---------------------------------------------------------------------------
// Job dispatch
// ---------------------------------------------------------------------------

/// Acknowledgement returned by the durable job bus for a batch of events.
///
/// `ids` holds one bus-assigned identifier per submitted event, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchAccepted {
    #[serde(default)]
    pub ids: Vec<String>,
}
