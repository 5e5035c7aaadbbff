//! Request authentication.
//!
//! # Responsibilities
//!
//! - Extract a session token from `Authorization: Bearer` or the `__session`
//!   cookie and verify it locally, without a network round trip.
//! - Attach an [`IdentityClaim`] to every request before routing.
//!
//! # Module invariants
//!
//! - **Authentication, not authorization.** The middleware never rejects a
//!   request. Handlers that need a caller use [`RequireAuth`], which answers
//!   `401 Unauthorized` for anonymous requests.
//! - Tokens and claims are never logged.

pub mod claim;
pub mod middleware;
pub mod verifier;

pub use claim::{IdentityClaim, Principal, RequireAuth};
pub use middleware::{attach_identity, Authenticator};
pub use verifier::TokenVerifier;
