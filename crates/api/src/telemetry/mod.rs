//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No credentials** (store URL passwords, bearer tokens, signing keys) may
//!   appear in any span attribute or log field. Use
//!   [`Config::redacted_store_url`](crate::config::Config::redacted_store_url)
//!   when logging the store location.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`) and overridden
//!   by `RUST_LOG` when set.

pub mod init;

pub use init::init_telemetry;
