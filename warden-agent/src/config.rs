//! Persisted agent configuration.
//!
//! Loaded once at startup and passed through the poll loop by reference —
//! the cached `device_id` is what lets subsequent boots skip registration.
//! Writes are atomic (temp file + rename) so a crash mid-save never leaves a
//! torn config behind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use warden_types::ConfigError;

const CONFIG_FILE: &str = "agent.json";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_REPORT_INTERVAL_SECS: u64 = 30;
const DEFAULT_DISCOVERY_PORT: u16 = 9123;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Cached device identity; None until first successful registration
    pub device_id: Option<String>,
    pub fingerprint_hash: Option<String>,

    pub server_url: String,

    /// Command poll cadence (sub-10s keeps remote actions responsive)
    pub poll_interval_secs: u64,
    /// Heartbeat/status report cadence
    pub report_interval_secs: u64,
    /// Loopback discovery endpoint port
    pub discovery_port: u16,

    /// Owner-approved wipe targets; the agent-local copy is the enforcement
    /// boundary for remote deletion
    #[serde(default)]
    pub approved_folders: Vec<String>,

    /// Root the browse protocol may list under; None disables browsing
    #[serde(default)]
    pub browse_root: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            fingerprint_hash: None,
            server_url: std::env::var("WARDEN_SERVER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8070".to_string()),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            report_interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            approved_folders: Vec::new(),
            browse_root: None,
        }
    }
}

impl AgentConfig {
    /// Default config path under the data directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(warden_core::utils::paths::get_data_dir()?.join(CONFIG_FILE))
    }

    /// Load the config, creating the default when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io { message: format!("read failed: {}", e) })?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse { message: e.to_string() })
    }

    /// Atomic write: temp file then rename.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io { message: format!("mkdir failed: {}", e) })?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse { message: e.to_string() })?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)
            .map_err(|e| ConfigError::Io { message: format!("write failed: {}", e) })?;
        fs::rename(&temp_path, path)
            .map_err(|e| ConfigError::Io { message: format!("rename failed: {}", e) })
    }
}
