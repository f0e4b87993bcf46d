//! API Routes
//!
//! REST endpoints for the agent and for the external dashboard.

mod agent;
mod devices;
mod wipe;

#[cfg(test)]
mod wipe_tests;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::state::AppState;
use warden_core::StoreError;
use warden_types::{DeviceError, WipeError};

pub fn router() -> Router<AppState> {
    Router::new()
        // Status
        .route("/status", get(get_status))
        // Agent
        .route("/agent/register", post(agent::register))
        .route("/agent/device/:device_id", get(agent::get_snapshot))
        .route("/agent/report", post(agent::report_status))
        .route("/agent/message_ack", post(agent::ack_message))
        .route("/agent/action_result", post(agent::action_result))
        // Devices (owner-facing)
        .route("/devices/link", post(devices::link_device))
        .route("/devices/:device_id", get(devices::get_device))
        .route("/trigger_action", post(devices::trigger_action))
        .route("/clear_alarm", post(devices::clear_alarm))
        .route("/set_geofence", post(devices::set_geofence))
        // Approved folders
        .route(
            "/v1/approved_folders/:device_id",
            get(wipe::list_approved).post(wipe::sync_approved),
        )
        // Wipe
        .route("/v1/wipe/trigger", post(wipe::trigger))
        .route("/v1/wipe/status/:device_id", get(wipe::status))
        .route("/v1/wipe/pending/:device_id", get(wipe::pending))
        .route("/v1/wipe/update_status", post(wipe::update_status))
        // Browse
        .route("/v1/wipe/request_browse/:device_id", post(wipe::request_browse))
        .route("/v1/wipe/browse/:device_id", get(wipe::browse))
        .route("/v1/wipe/browse_request/:device_id", get(wipe::browse_request))
        .route("/v1/wipe/browse_result", post(wipe::browse_result))
        // API fallback: return 404 for unknown API endpoints
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "Not found"})))
}

/// Map store errors onto the API's status-code contract: 404 unknown
/// device/operation, 409 conflicts, 400 malformed input, 500 otherwise.
pub(crate) fn error_response(err: StoreError) -> (StatusCode, String) {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_conflict() {
        StatusCode::CONFLICT
    } else {
        match &err {
            StoreError::Device(
                DeviceError::MissingFingerprint
                | DeviceError::MissingLinkSelector
                | DeviceError::InvalidStatus { .. },
            )
            | StoreError::Wipe(WipeError::EmptySelection | WipeError::PathRejected { .. }) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    };
    (status, err.to_string())
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    devices_count: u64,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        devices_count: state.device_count(),
    })
}
