//! Remote-wipe domain models: approved folders, wipe operations, and
//! directory listing entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a [`WipeOperation`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WipeStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl WipeStatus {
    /// Terminal states never transition again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for WipeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An owner-curated path eligible for remote deletion.
///
/// The set is held on the agent and synced to the server; the agent's local
/// copy is the enforcement boundary, the server copy exists so the dashboard
/// can show selectable targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovedFolder {
    pub id: i64,
    pub device_id: String,
    pub folder_path: String,
    pub created_at: DateTime<Utc>,
}

/// One remote wipe, from trigger to terminal state.
///
/// At most one non-terminal operation may exist per device at any time.
/// Partial completion is a valid terminal outcome: deleted files are never
/// rolled back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WipeOperation {
    pub id: i64,
    pub device_id: String,
    pub requested_paths: Vec<String>,
    pub status: WipeStatus,
    pub files_deleted: u64,
    pub total_files: u64,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WipeOperation {
    /// Derived progress in percent, clamped to 0..=100.
    pub fn progress_percentage(&self) -> u8 {
        if self.status == WipeStatus::Completed {
            return 100;
        }
        if self.total_files == 0 {
            return 0;
        }
        let pct = self.files_deleted.saturating_mul(100) / self.total_files;
        pct.min(100) as u8
    }
}

/// Kind of a directory listing entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    File,
}

/// One entry of a remote directory listing (browse protocol).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: Option<u64>,
}
