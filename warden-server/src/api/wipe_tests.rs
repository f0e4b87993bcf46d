use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;

use super::wipe::{
    browse, browse_request, browse_result, pending, request_browse, status, sync_approved,
    trigger, update_status, BrowseQuery,
};
use crate::test_helpers::{registered_device, test_app_state};
use warden_types::models::{DeviceStatus, EntryKind, FileEntry, WipeStatus};
use warden_types::protocol::{
    ApprovedFolderSync, BrowseRequestBody, BrowseResultReport, WipeProgressReport,
    WipeTriggerRequest,
};

fn folder_sync(folders: &[&str]) -> Json<ApprovedFolderSync> {
    Json(ApprovedFolderSync { folders: folders.iter().map(|s| s.to_string()).collect() })
}

#[tokio::test]
async fn test_sync_filters_denylisted_folders() {
    let state = test_app_state();
    let device_id = registered_device(&state, "a1");

    let Json(resp) = sync_approved(
        State(state.clone()),
        Path(device_id.clone()),
        folder_sync(&["/data/secrets", "/etc", "C:\\Windows\\Temp"]),
    )
    .await
    .unwrap();

    // Only the eligible folder survives
    assert_eq!(resp.count, 1);
    let folders = state.store().approved_folders(&device_id).unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].folder_path, "/data/secrets");
}

#[tokio::test]
async fn test_trigger_rejects_empty_paths() {
    let state = test_app_state();
    let device_id = registered_device(&state, "b1");

    let (code, _) = trigger(
        State(state),
        Json(WipeTriggerRequest { device_id, paths: vec![] }),
    )
    .await
    .unwrap_err();
    assert_eq!(code, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_single_active_wipe_conflict() {
    let state = test_app_state();
    let device_id = registered_device(&state, "c1");
    sync_approved(
        State(state.clone()),
        Path(device_id.clone()),
        folder_sync(&["/data/secrets"]),
    )
    .await
    .unwrap();

    let Json(first) = trigger(
        State(state.clone()),
        Json(WipeTriggerRequest {
            device_id: device_id.clone(),
            paths: vec!["/data/secrets".to_string()],
        }),
    )
    .await
    .unwrap();

    let (code, message) = trigger(
        State(state.clone()),
        Json(WipeTriggerRequest {
            device_id: device_id.clone(),
            paths: vec!["/data/secrets".to_string()],
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(code, StatusCode::CONFLICT);
    assert!(message.contains(&first.operation_id.to_string()));
}

#[tokio::test]
async fn test_wipe_lifecycle_via_handlers() {
    let state = test_app_state();
    let device_id = registered_device(&state, "d1");
    sync_approved(
        State(state.clone()),
        Path(device_id.clone()),
        folder_sync(&["/data/secrets"]),
    )
    .await
    .unwrap();

    let Json(created) = trigger(
        State(state.clone()),
        Json(WipeTriggerRequest {
            device_id: device_id.clone(),
            paths: vec!["/data/secrets".to_string()],
        }),
    )
    .await
    .unwrap();

    // Agent sees it pending
    let Json(pulled) = pending(State(state.clone()), Path(device_id.clone())).await.unwrap();
    assert!(pulled.has_pending);
    assert_eq!(pulled.operation_id, Some(created.operation_id));
    assert_eq!(pulled.paths, vec!["/data/secrets".to_string()]);

    // Progress
    let Json(view) = update_status(
        State(state.clone()),
        Json(WipeProgressReport {
            device_id: device_id.clone(),
            operation_id: created.operation_id,
            status: WipeStatus::InProgress,
            files_deleted: 10,
            total_files: 40,
            error_message: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(view.progress_percentage, 25);

    // Completion
    update_status(
        State(state.clone()),
        Json(WipeProgressReport {
            device_id: device_id.clone(),
            operation_id: created.operation_id,
            status: WipeStatus::Completed,
            files_deleted: 40,
            total_files: 40,
            error_message: None,
        }),
    )
    .await
    .unwrap();

    let Json(latest) = status(State(state.clone()), Path(device_id.clone())).await.unwrap();
    assert!(latest.has_operation);
    let view = latest.operation.unwrap();
    assert_eq!(view.operation.status, WipeStatus::Completed);
    assert_eq!(view.progress_percentage, 100);

    // No more pending work, device is wiped
    let Json(pulled) = pending(State(state.clone()), Path(device_id.clone())).await.unwrap();
    assert!(!pulled.has_pending);
    assert_eq!(state.store().get_device(&device_id).unwrap().status, DeviceStatus::Wiped);
}

#[tokio::test]
async fn test_browse_round_trip() {
    let state = test_app_state();
    let device_id = registered_device(&state, "e1");

    // Owner requests a listing
    let Json(created) = request_browse(
        State(state.clone()),
        Path(device_id.clone()),
        Json(BrowseRequestBody { path: "/data".to_string() }),
    )
    .await
    .unwrap();

    // Dashboard poll: still pending
    let Json(listing) = browse(
        State(state.clone()),
        Path(device_id.clone()),
        Query(BrowseQuery { path: "/data".to_string() }),
    )
    .await
    .unwrap();
    assert!(listing.pending);

    // Agent pulls the request
    let Json(pulled) = browse_request(State(state.clone()), Path(device_id.clone()))
        .await
        .unwrap();
    assert!(pulled.has_request);
    assert_eq!(pulled.path.as_deref(), Some("/data"));

    // Agent answers
    browse_result(
        State(state.clone()),
        Json(BrowseResultReport {
            device_id: device_id.clone(),
            request_id: created.request_id,
            path: "/data".to_string(),
            items: vec![FileEntry {
                name: "secrets".to_string(),
                path: "/data/secrets".to_string(),
                kind: EntryKind::Folder,
                size: None,
            }],
            error: None,
        }),
    )
    .await
    .unwrap();

    // Dashboard poll: resolved
    let Json(listing) = browse(
        State(state.clone()),
        Path(device_id.clone()),
        Query(BrowseQuery { path: "/data".to_string() }),
    )
    .await
    .unwrap();
    assert!(!listing.pending);
    assert_eq!(listing.count, 1);
    assert_eq!(listing.items[0].name, "secrets");

    // Request slot is consumed: nothing pending for the agent anymore
    let Json(pulled) = browse_request(State(state), Path(device_id)).await.unwrap();
    assert!(!pulled.has_request);
}

#[tokio::test]
async fn test_request_browse_rejects_blocked_path() {
    let state = test_app_state();
    let device_id = registered_device(&state, "f1");

    let (code, message) = request_browse(
        State(state),
        Path(device_id),
        Json(BrowseRequestBody { path: "/etc".to_string() }),
    )
    .await
    .unwrap_err();
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(message.contains("blocked"));
}
