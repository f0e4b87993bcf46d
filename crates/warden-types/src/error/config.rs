//! Configuration errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors while loading or persisting configuration files.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Filesystem read/write failure
    #[error("Config I/O error: {message}")]
    Io {
        /// Description of the failure
        message: String,
    },

    /// Config file exists but could not be parsed
    #[error("Config parse error: {message}")]
    Parse {
        /// Description of the parse failure
        message: String,
    },

    /// Data directory could not be resolved or created
    #[error("Data directory error: {message}")]
    DataDir {
        /// Description of the failure
        message: String,
    },
}
