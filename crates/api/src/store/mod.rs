//! Persistent store connection and document access.
//!
//! # Responsibilities
//!
//! - Establish the single connection pool to the document store at startup and
//!   confirm connectivity before the server binds its listener.
//! - Expose a [`Store`] handle that request handlers and job functions share
//!   for the remainder of the process lifetime.
//!
//! # Module invariants
//!
//! - **One pool per process.** Only [`StoreConnector::connect`] opens a
//!   connection; everything else receives the `Arc<dyn Store>` it returned.
//! - **No retries here.** A failed connect is reported to the lifecycle
//!   controller, which terminates the process. Reconnection after startup is
//!   the driver's concern.

#[cfg(test)]
pub mod memory;
pub mod model;
pub mod mongo;

pub use model::{ChatMessage, Difficulty, Session, SessionStatus, User};
pub use mongo::MongoConnector;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

/// Fatal errors raised while establishing the startup connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection string could not be parsed.
    #[error("invalid store connection string: {0}")]
    InvalidUrl(#[source] mongodb::error::Error),

    /// The client could not be built or did not acknowledge [`Store::ping`].
    #[error("store unreachable: {0}")]
    Unreachable(#[source] StoreError),

    /// Parsing, client setup and the connectivity check together exceeded the
    /// configured bound.
    #[error("store did not respond within {0:?}")]
    Timeout(Duration),
}

/// Recoverable errors raised by individual store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation failed: {0}")]
    Backend(#[from] mongodb::error::Error),

    /// Used by substitute stores that have no driver error to report.
    #[error("store operation failed: {0}")]
    Other(String),
}

/// Document operations used by route handlers and job functions.
///
/// Implementations must be safe to share across concurrent request tasks
/// without external locking.
#[async_trait]
pub trait Store: Send + Sync {
    /// Round-trip a no-op command to confirm the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert or replace the user identified by `user.clerk_id`.
    async fn upsert_user(&self, user: User) -> Result<(), StoreError>;

    /// Delete a user by identity provider id. Returns `true` if one was removed.
    async fn delete_user(&self, clerk_id: &str) -> Result<bool, StoreError>;

    async fn find_user(&self, clerk_id: &str) -> Result<Option<User>, StoreError>;

    async fn insert_session(&self, session: Session) -> Result<(), StoreError>;

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Active sessions, newest first.
    async fn active_sessions(&self) -> Result<Vec<Session>, StoreError>;

    /// Mark an active session completed. Returns `false` if no active session
    /// with that id exists.
    async fn complete_session(&self, id: &str) -> Result<bool, StoreError>;

    async fn insert_message(&self, message: ChatMessage) -> Result<(), StoreError>;
}

/// Opens the process-wide store connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Connect to `store_url` and wait until the store acknowledges
    /// connectivity or the connector's timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`]; callers treat any error as fatal.
    async fn connect(&self, store_url: &str) -> Result<Arc<dyn Store>, ConnectionError>;
}
