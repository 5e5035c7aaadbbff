//! Common types, protocol definitions, and errors shared across the interview platform crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
