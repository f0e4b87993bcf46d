//! Wire types for the agent-facing endpoints.

use serde::{Deserialize, Serialize};

use crate::models::{DeviceStatus, GeofenceConfig};

/// `POST /api/agent/register` — agent-first registration payload.
///
/// Sent on first boot, before any user account exists. Safe to retry: the
/// server answers with the existing `device_id` when the fingerprint is
/// already known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    pub fingerprint_hash: String,
    pub agent_version: String,
    pub hostname: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub architecture: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    #[serde(default)]
    pub mac_addresses: Vec<String>,
}

/// Registration outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterResponse {
    pub device_id: String,
    /// Whether the device is already linked to an owner account
    pub user_linked: bool,
    pub message: String,
}

/// What the agent polls each tick: canonical status plus any parameters the
/// command executor needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub status: DeviceStatus,
    pub is_missing: bool,
    /// Password the lock screen must require (set by the owner with the lock
    /// action)
    pub unlock_password: Option<String>,
    pub lock_message: Option<String>,
    /// One-shot message text; acknowledged via `message_ack` after display
    pub pending_message: Option<String>,
    pub geofence: GeofenceConfig,
}

/// A position fix included in a status report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LocationFix {
    pub lat: f64,
    pub lng: f64,
}

/// `POST /api/agent/report` — periodic status report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusReport {
    pub device_id: String,
    /// Present when the agent itself changed state (e.g. local unlock,
    /// geofence alarm); absent for a plain heartbeat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_wifi_ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationFix>,
    /// Human-readable reason, logged when the report carries a breach alarm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breach_reason: Option<String>,
}

/// Report outcome; carries the post-update snapshot so the agent sees
/// server-side transitions (e.g. a location-mode geofence alarm) immediately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportResponse {
    pub device: DeviceSnapshot,
}

/// `POST /api/agent/message_ack` — clears the one-shot pending message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageAckRequest {
    pub device_id: String,
}

/// `POST /api/agent/action_result` — outcome of a locally executed action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResultReport {
    pub device_id: String,
    /// Action kind, e.g. "lock" or "alarm"
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// `GET /device-info` — loopback discovery payload.
///
/// Served by the agent itself on 127.0.0.1 so a browser on the same machine
/// can discover this device's identity without copying anything manually.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfoResponse {
    pub device_id: String,
    pub fingerprint_hash: Option<String>,
    /// "registered" once a device_id exists, "pending" before
    pub status: String,
}
