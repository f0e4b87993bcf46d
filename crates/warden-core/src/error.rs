//! Store-level error type.

use thiserror::Error;
use warden_types::{DeviceError, WipeError};

/// Errors from the device state store.
///
/// Domain errors (`Device`, `Wipe`) pass through unchanged so API handlers
/// can map them to the right status codes; everything else is a database
/// failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Wipe(#[from] WipeError),
}

impl StoreError {
    /// Conflicts map to HTTP 409 at the API boundary.
    pub const fn is_conflict(&self) -> bool {
        match self {
            Self::Device(e) => e.is_conflict(),
            Self::Wipe(e) => e.is_conflict(),
            Self::Database(_) => false,
        }
    }

    /// Missing-row errors map to HTTP 404.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Device(DeviceError::NotFound { .. })
                | Self::Wipe(WipeError::OperationNotFound { .. })
        )
    }
}
