//! Owner-facing device handlers: linking, remote actions, geofence.
//!
//! Authentication is the external dashboard's concern; payloads arrive with a
//! pre-authenticated `owner_id` where ownership matters.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use warden_types::models::{Action, Device};
use warden_types::protocol::{
    ClearAlarmRequest, LinkRequest, LinkResponse, SetGeofenceRequest, TriggerActionRequest,
    TriggerActionResponse,
};

use super::error_response;
use crate::state::AppState;

/// `POST /api/devices/link` — attach an unowned device to an account.
///
/// Linking an already-owned device answers 409; ownership is never silently
/// reassigned.
pub async fn link_device(
    State(state): State<AppState>,
    Json(payload): Json<LinkRequest>,
) -> Result<Json<LinkResponse>, (StatusCode, String)> {
    let device = state
        .store()
        .link_owner(
            payload.owner_id,
            payload.device_id.as_deref(),
            payload.fingerprint_hash.as_deref(),
        )
        .map_err(error_response)?;

    info!("Linked device {} to owner {}", device.device_id, payload.owner_id);

    Ok(Json(LinkResponse {
        device,
        message: "Device linked successfully".to_string(),
    }))
}

/// `GET /api/devices/:device_id` — full device record for the dashboard.
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<Device>, (StatusCode, String)> {
    let device = state.store().get_device(&device_id).map_err(error_response)?;
    Ok(Json(device))
}

/// `POST /api/trigger_action` — owner-issued remote action, decoded once as
/// a tagged union at this boundary.
pub async fn trigger_action(
    State(state): State<AppState>,
    Json(payload): Json<TriggerActionRequest>,
) -> Result<Json<TriggerActionResponse>, (StatusCode, String)> {
    let store = state.store();
    let kind = payload.action.kind();

    let device = match &payload.action {
        Action::Lock { password, message } => store
            .lock_device(&payload.device_id, password, message.as_deref())
            .map_err(error_response)?,
        Action::Alarm => store.trigger_alarm(&payload.device_id).map_err(error_response)?,
        Action::ClearAlarm => store.clear_alarm(&payload.device_id).map_err(error_response)?,
        Action::Message { text } => {
            store.set_message(&payload.device_id, text).map_err(error_response)?
        }
        Action::Wipe { paths } => {
            let operation = store.create_wipe(&payload.device_id, paths).map_err(error_response)?;
            let device = store.get_device(&payload.device_id).map_err(error_response)?;
            return Ok(Json(TriggerActionResponse {
                message: format!("wipe action triggered (operation {})", operation.id),
                device,
            }));
        }
    };

    info!("Action {} triggered for {}", kind, payload.device_id);

    Ok(Json(TriggerActionResponse {
        message: format!("{} action triggered", kind),
        device,
    }))
}

/// `POST /api/clear_alarm` — return an alarming device to active.
pub async fn clear_alarm(
    State(state): State<AppState>,
    Json(payload): Json<ClearAlarmRequest>,
) -> Result<Json<TriggerActionResponse>, (StatusCode, String)> {
    let device = state.store().clear_alarm(&payload.device_id).map_err(error_response)?;
    Ok(Json(TriggerActionResponse {
        message: "Alarm cleared".to_string(),
        device,
    }))
}

/// `POST /api/set_geofence` — configure the safe zone. WiFi and location
/// parameters are separate, explicitly named fields.
pub async fn set_geofence(
    State(state): State<AppState>,
    Json(payload): Json<SetGeofenceRequest>,
) -> Result<Json<Device>, (StatusCode, String)> {
    let device = state.store().set_geofence(&payload).map_err(error_response)?;
    Ok(Json(device))
}
