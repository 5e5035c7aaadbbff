//! HTTP surface: routing, middleware, and handlers.
//!
//! # Responsibilities
//! - Compose the router in a fixed middleware order, parameterised by
//!   environment mode (see [`router::build`]).
//! - Translate request-level errors into structured JSON responses.
//! - Serve the job bus webhook and the business route groups.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
pub mod webhook;
