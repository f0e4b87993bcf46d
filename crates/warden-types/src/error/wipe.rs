//! Wipe-protocol errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while triggering or executing remote wipe operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum WipeError {
    /// A non-terminal operation already exists for this device
    #[error("A wipe operation is already active (operation {operation_id})")]
    OperationActive {
        /// Identifier of the existing operation
        operation_id: i64,
    },

    /// The device has no owner-approved folders, so nothing is eligible
    #[error("Device {device_id} has no approved folders")]
    NoApprovedFolders {
        /// Identifier of the device
        device_id: String,
    },

    /// Trigger request with an empty path list
    #[error("paths array is required and must not be empty")]
    EmptySelection,

    /// A path failed allowlist/denylist validation
    #[error("Path rejected: {path} ({reason})")]
    PathRejected {
        /// The offending path as supplied
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Progress report referencing an unknown operation
    #[error("Wipe operation not found: {operation_id}")]
    OperationNotFound {
        /// Identifier from the report
        operation_id: i64,
    },
}

impl WipeError {
    /// Conflicts map to HTTP 409 at the API boundary.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::OperationActive { .. } | Self::NoApprovedFolders { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_conflict() {
        assert!(WipeError::OperationActive { operation_id: 1 }.is_conflict());
        assert!(WipeError::NoApprovedFolders { device_id: "d".to_string() }.is_conflict());
        assert!(!WipeError::EmptySelection.is_conflict());
    }
}
