//! Wire types for the owner-facing (dashboard) endpoints.
//!
//! Authentication happens in the out-of-scope dashboard layer; these payloads
//! carry a pre-authenticated `owner_id` where ownership matters.

use serde::{Deserialize, Serialize};

use crate::models::{Action, Device, GeofenceMode};

/// `POST /api/devices/link` — attach an unowned device to an account.
///
/// Exactly one of `device_id` / `fingerprint_hash` must be set (the browser
/// discovers either via the agent's loopback endpoint). Linking an
/// already-owned device fails with a conflict, never a silent reassign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkRequest {
    pub owner_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint_hash: Option<String>,
}

/// Link outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkResponse {
    pub device: Device,
    pub message: String,
}

/// `POST /api/trigger_action` — owner-issued remote action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerActionRequest {
    pub device_id: String,
    #[serde(flatten)]
    pub action: Action,
}

/// Action trigger outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerActionResponse {
    pub message: String,
    pub device: Device,
}

/// `POST /api/clear_alarm` — return an alarming device to active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearAlarmRequest {
    pub device_id: String,
}

/// `POST /api/set_geofence` — configure the safe zone.
///
/// Fields are optional so the dashboard can update a subset; `mode` selects
/// which of the threshold/radius fields applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetGeofenceRequest {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<GeofenceMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_threshold_percent: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_m: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_action_flattened_wire_form() {
        let req: TriggerActionRequest = serde_json::from_str(
            r#"{"device_id":"dev-1","action":"lock","password":"pw"}"#,
        )
        .unwrap();
        assert_eq!(req.device_id, "dev-1");
        assert_eq!(req.action, Action::Lock { password: "pw".to_string(), message: None });
    }

    #[test]
    fn test_link_request_selector_optional() {
        let req: LinkRequest =
            serde_json::from_str(r#"{"owner_id":1,"fingerprint_hash":"abc"}"#).unwrap();
        assert!(req.device_id.is_none());
        assert_eq!(req.fingerprint_hash.as_deref(), Some("abc"));
    }
}
