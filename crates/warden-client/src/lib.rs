//! Typed HTTP client for the Warden server API.
//!
//! The endpoint agent is always the initiator: registration, status
//! reports, command polls, and the wipe/browse sub-protocol all go through
//! [`WardenClient`]. Transient failures (connection refused, 5xx) are
//! retried with bounded exponential backoff; conflicts and 404s surface as
//! typed errors so callers can react without parsing messages.

mod client;
mod error;
mod types;

pub use client::WardenClient;
pub use error::ClientError;
pub use types::{ClientConfig, RetryPolicy};
