use std::fs;
use std::path::PathBuf;

use warden_types::ConfigError;

const DATA_DIR: &str = ".warden";

/// Get data directory path.
///
/// Priority:
/// 1. `WARDEN_DATA_DIR` environment variable (containers, tests)
/// 2. `~/.warden` (default)
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = if let Ok(custom_dir) = std::env::var("WARDEN_DATA_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::DataDir { message: "home directory unavailable".to_string() })?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)
            .map_err(|e| ConfigError::DataDir { message: format!("create failed: {}", e) })?;
    }

    Ok(data_dir)
}
