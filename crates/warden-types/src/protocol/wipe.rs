//! Wire types for the approved-folder registry and the wipe/browse
//! sub-protocols.

use serde::{Deserialize, Serialize};

use crate::models::{ApprovedFolder, FileEntry, WipeOperation, WipeStatus};

/// `POST /api/v1/approved_folders/:device_id` — agent replaces the server's
/// copy of the allowlist wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovedFolderSync {
    pub folders: Vec<String>,
}

/// Sync outcome; `count` is the number of folders that survived the server's
/// denylist filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovedFolderSyncResponse {
    pub message: String,
    pub count: usize,
}

/// `GET /api/v1/approved_folders/:device_id` — dashboard listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovedFolderList {
    pub approved_folders: Vec<ApprovedFolder>,
}

/// `POST /api/v1/wipe/trigger` — owner selects targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WipeTriggerRequest {
    pub device_id: String,
    pub paths: Vec<String>,
}

/// Trigger outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WipeTriggerResponse {
    pub message: String,
    pub operation_id: i64,
    pub paths: Vec<String>,
}

/// Serialized view of a [`WipeOperation`] with the derived progress field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WipeOperationView {
    #[serde(flatten)]
    pub operation: WipeOperation,
    pub progress_percentage: u8,
}

impl From<WipeOperation> for WipeOperationView {
    fn from(operation: WipeOperation) -> Self {
        let progress_percentage = operation.progress_percentage();
        Self { operation, progress_percentage }
    }
}

/// `GET /api/v1/wipe/status/:device_id` — latest operation for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WipeStatusResponse {
    pub has_operation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<WipeOperationView>,
}

/// `GET /api/v1/wipe/pending/:device_id` — agent pull.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingWipeResponse {
    pub has_pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<i64>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WipeStatus>,
}

/// `POST /api/v1/wipe/update_status` — agent progress/terminal report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WipeProgressReport {
    pub device_id: String,
    pub operation_id: i64,
    pub status: WipeStatus,
    pub files_deleted: u64,
    pub total_files: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// `POST /api/v1/wipe/request_browse/:device_id` — owner asks for a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowseRequestBody {
    pub path: String,
}

/// Browse request accepted; the dashboard polls until the agent answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowseRequestCreated {
    pub message: String,
    pub path: String,
    pub request_id: String,
}

/// `GET /api/v1/wipe/browse_request/:device_id` — agent pull.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingBrowseResponse {
    pub has_request: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// `POST /api/v1/wipe/browse_result` — agent posts the listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowseResultReport {
    pub device_id: String,
    pub request_id: String,
    pub path: String,
    #[serde(default)]
    pub items: Vec<FileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/v1/wipe/browse/:device_id?path=` — dashboard poll result.
///
/// `pending` stays true until the agent has answered for this path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowseListing {
    pub path: String,
    pub items: Vec<FileEntry>,
    pub count: usize,
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_operation_view_includes_progress() {
        let op = WipeOperation {
            id: 3,
            device_id: "dev-1".to_string(),
            requested_paths: vec!["/data".to_string()],
            status: WipeStatus::InProgress,
            files_deleted: 50,
            total_files: 200,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        let view = WipeOperationView::from(op);
        assert_eq!(view.progress_percentage, 25);

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"progress_percentage\":25"));
        // flattened operation fields sit at the top level
        assert!(json.contains("\"files_deleted\":50"));
    }

    #[test]
    fn test_pending_wipe_empty_form() {
        let resp: PendingWipeResponse =
            serde_json::from_str(r#"{"has_pending":false}"#).unwrap();
        assert!(!resp.has_pending);
        assert!(resp.paths.is_empty());
    }
}
