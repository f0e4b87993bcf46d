//! Device-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during device registration, linking, and command
/// dispatch.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum DeviceError {
    /// Device with given ID not found
    #[error("Device not found: {device_id}")]
    NotFound {
        /// Identifier of the missing device
        device_id: String,
    },

    /// Attempt to link a device that already belongs to an account
    #[error("Device {device_id} is already linked to another user")]
    AlreadyOwned {
        /// Identifier of the claimed device
        device_id: String,
    },

    /// Registration payload without a fingerprint
    #[error("fingerprint_hash is required")]
    MissingFingerprint,

    /// Stored status string that no enum variant matches
    #[error("Invalid device status: {value}")]
    InvalidStatus {
        /// The unparseable value
        value: String,
    },

    /// Link request naming neither a device_id nor a fingerprint
    #[error("Either device_id or fingerprint_hash is required to link")]
    MissingLinkSelector,
}

impl DeviceError {
    /// Conflicts map to HTTP 409 at the API boundary.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyOwned { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_conflict() {
        let conflict = DeviceError::AlreadyOwned { device_id: "d".to_string() };
        let not_found = DeviceError::NotFound { device_id: "d".to_string() };

        assert!(conflict.is_conflict());
        assert!(!not_found.is_conflict());
    }
}
