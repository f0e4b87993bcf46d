//! Device record and geofence configuration.
//!
//! A [`Device`] is the canonical server-side record of one physical endpoint.
//! It is created unowned at first agent contact and linked to an owner at most
//! once. Status transitions flow through the agent's command executor and the
//! geofence paths, never directly from dashboard handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Device is checking in normally
    Active,
    /// Device has not been seen within the offline threshold
    Missing,
    /// Owner requested a remote lock
    Locked,
    /// Alarm is sounding (owner-triggered or geofence breach)
    Alarm,
    /// A remote wipe ran to completion
    Wiped,
}

impl DeviceStatus {
    /// Stable lowercase name used in the database and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Missing => "missing",
            Self::Locked => "locked",
            Self::Alarm => "alarm",
            Self::Wiped => "wiped",
        }
    }

    /// Parse a stored status string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "missing" => Some(Self::Missing),
            "locked" => Some(Self::Locked),
            "alarm" => Some(Self::Alarm),
            "wiped" => Some(Self::Wiped),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a geofence is evaluated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceMode {
    /// Breach when disconnected from the configured SSID or when the signal
    /// falls below the configured threshold. Evaluated on the agent.
    #[default]
    Wifi,
    /// Breach when the reported position moves beyond the configured radius
    /// from the reference point. Evaluated on the server from status reports.
    Location,
}

/// Owner-configured safe zone.
///
/// The source system stored the WiFi signal threshold and the location radius
/// in one overloaded numeric column. They are separate fields here:
/// `signal_threshold_percent` only applies in [`GeofenceMode::Wifi`] and
/// `radius_m` only in [`GeofenceMode::Location`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeofenceConfig {
    pub enabled: bool,
    pub mode: GeofenceMode,
    pub wifi_ssid: Option<String>,
    pub signal_threshold_percent: Option<i32>,
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
    pub radius_m: Option<f64>,
}

/// Canonical device record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    /// Stable identifier, generated at registration
    pub device_id: String,

    /// SHA-256 hardware fingerprint (unique); None for legacy rows
    pub fingerprint_hash: Option<String>,

    /// Human-readable name built from vendor/model/OS metadata
    pub name: String,

    /// Owning account; None means the device is still unowned
    pub owner_id: Option<i64>,

    pub status: DeviceStatus,
    pub is_missing: bool,

    // Hardware / OS metadata reported by the agent at registration
    pub hostname: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub architecture: Option<String>,
    pub serial_number: Option<String>,
    pub mac_addresses: Vec<String>,

    pub last_seen: Option<DateTime<Utc>>,
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
    pub current_wifi_ssid: Option<String>,

    /// Owner-set password required to dismiss the lock screen.
    /// Compared verbatim (case-sensitive), matching source behavior.
    pub unlock_password: Option<String>,
    /// Optional text shown on the lock screen
    pub lock_message: Option<String>,
    /// One-shot owner message; cleared once the agent acknowledges it
    pub pending_message: Option<String>,

    pub geofence: GeofenceConfig,
    /// Server-side location-mode breach tracking state
    pub was_inside_geofence: bool,

    pub registered_at: Option<DateTime<Utc>>,
}

impl Device {
    pub const fn is_owned(&self) -> bool {
        self.owner_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DeviceStatus::Active,
            DeviceStatus::Missing,
            DeviceStatus::Locked,
            DeviceStatus::Alarm,
            DeviceStatus::Wiped,
        ] {
            assert_eq!(DeviceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeviceStatus::parse("wiping"), None);
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&DeviceStatus::Locked).unwrap();
        assert_eq!(json, "\"locked\"");
        let parsed: DeviceStatus = serde_json::from_str("\"alarm\"").unwrap();
        assert_eq!(parsed, DeviceStatus::Alarm);
    }

    #[test]
    fn test_geofence_defaults() {
        let config = GeofenceConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.mode, GeofenceMode::Wifi);
        assert!(config.wifi_ssid.is_none());
    }
}
