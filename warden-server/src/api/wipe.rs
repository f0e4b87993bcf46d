//! Approved-folder registry and wipe/browse handlers.
//!
//! Server-side wipe validation covers two conditions: no concurrent
//! non-terminal operation, and at least one approved folder. Path
//! membership is enforced on the agent, which treats this
//! server's instructions as untrusted input; a path the agent rejects
//! surfaces asynchronously through the operation's `failed`/`error_message`
//! fields, not as an HTTP error.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use warden_core::modules::safety;
use warden_types::protocol::{
    ApprovedFolderList, ApprovedFolderSync, ApprovedFolderSyncResponse, BrowseListing,
    BrowseRequestBody, BrowseRequestCreated, BrowseResultReport, PendingBrowseResponse,
    PendingWipeResponse, WipeOperationView, WipeProgressReport, WipeStatusResponse,
    WipeTriggerRequest, WipeTriggerResponse,
};

use super::error_response;
use crate::state::AppState;

// ----------------------------------------------------------------------
// Approved folders
// ----------------------------------------------------------------------

/// `POST /api/v1/approved_folders/:device_id` — agent replaces the server's
/// copy of the allowlist. The denylist filter runs here too so the dashboard
/// never offers an OS-critical path as a wipe target.
pub async fn sync_approved(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(payload): Json<ApprovedFolderSync>,
) -> Result<Json<ApprovedFolderSyncResponse>, (StatusCode, String)> {
    let sanitized = safety::sanitize_approved_folders(&payload.folders);
    let dropped = payload.folders.len().saturating_sub(sanitized.len());
    if dropped > 0 {
        warn!("Dropped {} ineligible folder(s) from sync for {}", dropped, device_id);
    }

    let count = state
        .store()
        .replace_approved_folders(&device_id, &sanitized)
        .map_err(error_response)?;

    info!("Approved folders updated for device {}: {} folders", device_id, count);

    Ok(Json(ApprovedFolderSyncResponse {
        message: "Approved folders updated successfully".to_string(),
        count,
    }))
}

/// `GET /api/v1/approved_folders/:device_id` — dashboard listing.
pub async fn list_approved(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<ApprovedFolderList>, (StatusCode, String)> {
    let approved_folders = state.store().approved_folders(&device_id).map_err(error_response)?;
    Ok(Json(ApprovedFolderList { approved_folders }))
}

// ----------------------------------------------------------------------
// Wipe operations
// ----------------------------------------------------------------------

/// `POST /api/v1/wipe/trigger` — owner selects targets.
pub async fn trigger(
    State(state): State<AppState>,
    Json(payload): Json<WipeTriggerRequest>,
) -> Result<Json<WipeTriggerResponse>, (StatusCode, String)> {
    let operation = state
        .store()
        .create_wipe(&payload.device_id, &payload.paths)
        .map_err(error_response)?;

    info!(
        "Wipe operation {} triggered for device {}: {} path(s)",
        operation.id,
        payload.device_id,
        operation.requested_paths.len()
    );

    Ok(Json(WipeTriggerResponse {
        message: "Wipe operation triggered".to_string(),
        operation_id: operation.id,
        paths: operation.requested_paths,
    }))
}

/// `GET /api/v1/wipe/status/:device_id` — latest operation with derived
/// progress.
pub async fn status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<WipeStatusResponse>, (StatusCode, String)> {
    let latest = state.store().latest_wipe(&device_id).map_err(error_response)?;
    Ok(Json(WipeStatusResponse {
        has_operation: latest.is_some(),
        operation: latest.map(WipeOperationView::from),
    }))
}

/// `GET /api/v1/wipe/pending/:device_id` — agent pull.
pub async fn pending(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<PendingWipeResponse>, (StatusCode, String)> {
    let pending = state.store().pending_wipe(&device_id).map_err(error_response)?;
    Ok(Json(match pending {
        Some(op) => PendingWipeResponse {
            has_pending: true,
            operation_id: Some(op.id),
            paths: op.requested_paths,
            status: Some(op.status),
        },
        None => PendingWipeResponse {
            has_pending: false,
            operation_id: None,
            paths: vec![],
            status: None,
        },
    }))
}

/// `POST /api/v1/wipe/update_status` — agent progress/terminal report.
pub async fn update_status(
    State(state): State<AppState>,
    Json(payload): Json<WipeProgressReport>,
) -> Result<Json<WipeOperationView>, (StatusCode, String)> {
    let operation = state.store().update_wipe(&payload).map_err(error_response)?;
    Ok(Json(WipeOperationView::from(operation)))
}

// ----------------------------------------------------------------------
// Browse
// ----------------------------------------------------------------------

/// `POST /api/v1/wipe/request_browse/:device_id` — owner asks for a listing.
pub async fn request_browse(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(payload): Json<BrowseRequestBody>,
) -> Result<Json<BrowseRequestCreated>, (StatusCode, String)> {
    // The agent enforces its browse root; the server still refuses paths it
    // can already tell are OS-critical.
    if let Some(prefix) = safety::blocked_prefix(&payload.path) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("path is inside blocked system prefix {}", prefix),
        ));
    }
    state.store().get_device(&device_id).map_err(error_response)?;

    let request_id = state.create_browse_request(&device_id, &payload.path);
    Ok(Json(BrowseRequestCreated {
        message: "Browse request created".to_string(),
        path: payload.path,
        request_id,
    }))
}

#[derive(Deserialize)]
pub struct BrowseQuery {
    pub path: String,
}

/// `GET /api/v1/wipe/browse/:device_id?path=` — dashboard polls until the
/// agent has answered (bounded retry on the dashboard side).
pub async fn browse(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<BrowseListing>, (StatusCode, String)> {
    state.store().get_device(&device_id).map_err(error_response)?;
    Ok(Json(state.browse_lookup(&device_id, &query.path)))
}

/// `GET /api/v1/wipe/browse_request/:device_id` — agent pull.
pub async fn browse_request(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<PendingBrowseResponse>, (StatusCode, String)> {
    state.store().get_device(&device_id).map_err(error_response)?;
    Ok(Json(match state.pending_browse_for(&device_id) {
        Some((path, request_id)) => PendingBrowseResponse {
            has_request: true,
            path: Some(path),
            request_id: Some(request_id),
        },
        None => PendingBrowseResponse { has_request: false, path: None, request_id: None },
    }))
}

/// `POST /api/v1/wipe/browse_result` — agent posts the listing.
pub async fn browse_result(
    State(state): State<AppState>,
    Json(payload): Json<BrowseResultReport>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state.store().get_device(&payload.device_id).map_err(error_response)?;
    state.store_browse_result(&payload.request_id, &payload.path, payload.items, payload.error);
    Ok(Json(serde_json::json!({"message": "Browse result received"})))
}
