//! Typed error definitions for Warden.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for API responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants
//! - **Composable** via thiserror derive macros

mod config;
mod device;
mod wipe;

pub use config::ConfigError;
pub use device::DeviceError;
pub use wipe::WipeError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
///
/// Use this when you need a single error type that can represent
/// any Warden error.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a device-related error
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Wraps a wipe-protocol error
    #[error("Wipe error: {0}")]
    Wipe(#[from] WipeError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;
