//! The unit of work submitted to the durable job bus.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A self-describing event handed to the bus.
///
/// `data` is plain JSON, so an event never refers to in-process state and can
/// outlive the request that produced it. `id` is the idempotency key: the bus
/// drops duplicates carrying the same `id` within its dedup window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchedEvent {
    pub name: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event time in unix milliseconds. The bus stamps receipt time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

impl DispatchedEvent {
    /// Build an event from any serialisable payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` cannot be represented as JSON.
    pub fn new(name: impl Into<String>, data: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name: name.into(),
            data: serde_json::to_value(data)?,
            id: None,
            ts: Some(chrono::Utc::now().timestamp_millis()),
        })
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.id = Some(key.into());
        self
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
