//! Durable job dispatch: event submission to the external bus and delivery of
//! bus callbacks to background functions.
//!
//! # Flow
//!
//! ```text
//! handler ──submit──▶ JobBus (Inngest event API) ──▶ bus queue
//!                                                       │ at-least-once
//! FunctionRegistry::deliver ◀── POST /api/inngest ◀─────┘
//! ```
//!
//! # Module invariants
//!
//! - **Fire-and-forget.** [`JobBus::submit`] awaits only the bus's enqueue
//!   acknowledgement, never job completion.
//! - **No internal retries.** Failures are returned as [`DispatchError`] and
//!   the calling handler decides whether to retry, degrade, or fail.
//! - **Idempotency keys are always forwarded.** Deduplication within the
//!   bus's window is the bus's job; this module never drops a keyed event.

pub mod event;
pub mod functions;
pub mod inngest;
pub mod manifest;
#[cfg(test)]
pub mod memory;
pub mod signature;

pub use event::DispatchedEvent;
pub use functions::{FunctionRegistry, JobError, JobFunction};
pub use inngest::InngestClient;
pub use manifest::Manifest;

use async_trait::async_trait;
use common::protocol::DispatchAccepted;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The bus answered but refused the submission.
    #[error("job bus rejected submission with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The bus could not be reached at all.
    #[error("job bus unreachable: {0}")]
    Unreachable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The bus acknowledged with a body this adapter cannot read.
    #[error("job bus returned an unreadable response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// Whether the bus changed its stored function configuration.
    pub modified: bool,
}

/// Boundary to the external durable event bus.
#[async_trait]
pub trait JobBus: Send + Sync {
    /// Enqueue a batch of events. Ownership of each event passes to the bus
    /// once this returns `Ok`.
    async fn submit_batch(
        &self,
        events: &[DispatchedEvent],
    ) -> Result<DispatchAccepted, DispatchError>;

    async fn submit(&self, event: &DispatchedEvent) -> Result<DispatchAccepted, DispatchError> {
        self.submit_batch(std::slice::from_ref(event)).await
    }

    /// Publish this app's function manifest so the bus knows where to deliver.
    async fn register(&self, manifest: &Manifest) -> Result<RegistrationOutcome, DispatchError>;
}
