//! Agent-facing handlers: registration, poll snapshot, status reports.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use warden_types::models::Device;
use warden_types::protocol::{
    ActionResultReport, DeviceSnapshot, MessageAckRequest, RegisterRequest, RegisterResponse,
    ReportResponse, StatusReport,
};

use super::error_response;
use crate::state::AppState;

/// The per-tick view a device record reduces to for its agent.
pub(crate) fn snapshot_of(device: &Device) -> DeviceSnapshot {
    DeviceSnapshot {
        device_id: device.device_id.clone(),
        status: device.status,
        is_missing: device.is_missing,
        unlock_password: device.unlock_password.clone(),
        lock_message: device.lock_message.clone(),
        pending_message: device.pending_message.clone(),
        geofence: device.geofence.clone(),
    }
}

/// `POST /api/agent/register` — agent-first registration.
///
/// Looks up by fingerprint and returns the existing `device_id` when known
/// (idempotent, safe to retry); creates a new unowned device otherwise.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, String)> {
    let (device, created) = state.store().register_agent(&payload).map_err(error_response)?;

    let fp_preview: String = payload.fingerprint_hash.chars().take(16).collect();
    if created {
        info!("New device registered: {} (fingerprint: {}...)", device.device_id, fp_preview);
    } else {
        info!("Existing device found: {} (fingerprint: {}...)", device.device_id, fp_preview);
    }

    let response = RegisterResponse {
        device_id: device.device_id.clone(),
        user_linked: device.is_owned(),
        message: if created {
            "Device registered successfully. Waiting for user account link.".to_string()
        } else {
            "Device already registered".to_string()
        },
    };
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(response)))
}

/// `GET /api/agent/device/:device_id` — the poll tick's canonical snapshot.
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceSnapshot>, (StatusCode, String)> {
    let device = state.store().get_device(&device_id).map_err(error_response)?;
    Ok(Json(snapshot_of(&device)))
}

/// `POST /api/agent/report` — heartbeat / status / location report.
pub async fn report_status(
    State(state): State<AppState>,
    Json(payload): Json<StatusReport>,
) -> Result<Json<ReportResponse>, (StatusCode, String)> {
    let device = state.store().record_report(&payload).map_err(error_response)?;
    Ok(Json(ReportResponse { device: snapshot_of(&device) }))
}

/// `POST /api/agent/message_ack` — one-shot message was displayed.
pub async fn ack_message(
    State(state): State<AppState>,
    Json(payload): Json<MessageAckRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state.store().ack_message(&payload.device_id).map_err(error_response)?;
    Ok(Json(serde_json::json!({"message": "acknowledged"})))
}

/// `POST /api/agent/action_result` — audit-trail entry for an executed or
/// failed local action.
pub async fn action_result(
    State(state): State<AppState>,
    Json(payload): Json<ActionResultReport>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state
        .store()
        .record_action_result(
            &payload.device_id,
            &payload.action,
            payload.success,
            payload.detail.as_deref(),
        )
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({"message": "recorded"})))
}
