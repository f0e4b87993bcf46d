//! Remote wipe execution.
//!
//! The server's path list is untrusted input. Every requested path is
//! re-validated against the locally held approved set and the OS-critical
//! denylist before anything is touched; rejected paths are logged and
//! disclosed in the operation's error message. If nothing survives
//! validation the operation fails outright and no file is deleted.
//!
//! Deletion is incremental (files first, directories bottom-up) with
//! progress reported every [`PROGRESS_EVERY`] deletions. Files already
//! deleted are never rolled back: partial completion is a valid terminal
//! outcome.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use warden_client::WardenClient;
use warden_core::modules::safety;
use warden_types::models::WipeStatus;
use warden_types::protocol::WipeProgressReport;

const PROGRESS_EVERY: u64 = 25;

/// Result of the local deletion pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WipeSummary {
    pub files_deleted: u64,
    pub total_items: u64,
    pub errors: Vec<String>,
}

/// Count the items (files and directories) the accepted paths cover.
pub fn count_items(paths: &[String]) -> u64 {
    let mut total = 0;
    for path_str in paths {
        let path = Path::new(path_str);
        if !path.exists() {
            continue;
        }
        if path.is_file() {
            total += 1;
        } else {
            total += WalkDir::new(path).into_iter().filter_map(Result::ok).count() as u64;
        }
    }
    total
}

/// Delete the accepted paths, invoking `on_progress(deleted, total)` every
/// [`PROGRESS_EVERY`] deletions. Per-item failures are collected, never
/// fatal.
pub fn delete_paths(paths: &[String], mut on_progress: impl FnMut(u64, u64)) -> WipeSummary {
    let total = count_items(paths);
    let mut deleted = 0;
    let mut errors = Vec::new();

    let mut bump = |deleted: &mut u64, on_progress: &mut dyn FnMut(u64, u64)| {
        *deleted += 1;
        if *deleted % PROGRESS_EVERY == 0 {
            on_progress(*deleted, total);
        }
    };

    for path_str in paths {
        let path = Path::new(path_str);
        if !path.exists() {
            warn!("Wipe target does not exist, skipping: {}", path_str);
            continue;
        }

        if path.is_file() {
            match std::fs::remove_file(path) {
                Ok(()) => bump(&mut deleted, &mut on_progress),
                Err(e) => errors.push(format!("{}: {}", path_str, e)),
            }
            continue;
        }

        // contents_first yields children before their directory, so files go
        // first and each directory is empty by the time it comes up
        for entry in WalkDir::new(path).contents_first(true).into_iter().filter_map(Result::ok) {
            let result = if entry.file_type().is_dir() {
                std::fs::remove_dir(entry.path())
            } else {
                std::fs::remove_file(entry.path())
            };
            match result {
                Ok(()) => bump(&mut deleted, &mut on_progress),
                Err(e) => errors.push(format!("{}: {}", entry.path().display(), e)),
            }
        }
    }

    WipeSummary { files_deleted: deleted, total_items: total, errors }
}

/// Decide the terminal report for an operation.
///
/// All paths rejected → `failed`, nothing was deleted. Otherwise
/// `completed`, with rejections and per-item errors disclosed in the error
/// message (narrowing is never silent).
pub fn compose_outcome(
    rejected: &[(String, String)],
    summary: Option<&WipeSummary>,
) -> (WipeStatus, Option<String>) {
    let Some(summary) = summary else {
        let detail = rejected
            .iter()
            .map(|(path, reason)| format!("{} ({})", path, reason))
            .collect::<Vec<_>>()
            .join("; ");
        return (WipeStatus::Failed, Some(format!("All requested paths rejected: {}", detail)));
    };

    let mut notes = Vec::new();
    if !rejected.is_empty() {
        let listed =
            rejected.iter().map(|(path, _)| path.as_str()).collect::<Vec<_>>().join(", ");
        notes.push(format!("{} path(s) rejected by allowlist: {}", rejected.len(), listed));
    }
    if !summary.errors.is_empty() {
        let preview = summary.errors.iter().take(3).cloned().collect::<Vec<_>>().join("; ");
        notes.push(format!("{} deletion error(s): {}", summary.errors.len(), preview));
    }

    let message = if notes.is_empty() { None } else { Some(notes.join(". ")) };
    (WipeStatus::Completed, message)
}

/// Execute one pending wipe operation end to end, reporting progress and the
/// terminal status to the server. `guard` enforces the agent side of the
/// single-active-wipe invariant; it is released on every exit path.
pub async fn execute(
    client: WardenClient,
    device_id: String,
    operation_id: i64,
    requested: Vec<String>,
    approved: Vec<String>,
    guard: Arc<AtomicBool>,
) {
    info!(
        "Executing wipe operation {} ({} requested path(s))",
        operation_id,
        requested.len()
    );

    let (accepted, rejected) = safety::partition_wipe_paths(&requested, &approved);
    for (path, reason) in &rejected {
        warn!("Rejected wipe path {}: {}", path, reason);
    }

    let report = |status: WipeStatus, deleted: u64, total: u64, error: Option<String>| {
        let client = client.clone();
        let device_id = device_id.clone();
        async move {
            let result = client
                .report_wipe_progress(&WipeProgressReport {
                    device_id,
                    operation_id,
                    status,
                    files_deleted: deleted,
                    total_files: total,
                    error_message: error,
                })
                .await;
            if let Err(e) = result {
                error!("Failed to report wipe status: {}", e);
            }
        }
    };

    if accepted.is_empty() {
        let (status, message) = compose_outcome(&rejected, None);
        report(status, 0, 0, message).await;
        guard.store(false, Ordering::SeqCst);
        return;
    }

    report(WipeStatus::InProgress, 0, 0, None).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let paths = accepted.clone();
    let worker = tokio::task::spawn_blocking(move || {
        delete_paths(&paths, |deleted, total| {
            let _ = tx.send((deleted, total));
        })
    });

    while let Some((deleted, total)) = rx.recv().await {
        report(WipeStatus::InProgress, deleted, total, None).await;
    }

    match worker.await {
        Ok(summary) => {
            info!(
                "Wipe operation {} finished: {}/{} items deleted, {} error(s)",
                operation_id,
                summary.files_deleted,
                summary.total_items,
                summary.errors.len()
            );
            let (status, message) = compose_outcome(&rejected, Some(&summary));
            report(status, summary.files_deleted, summary.total_items, message).await;
        }
        Err(e) => {
            error!("Wipe worker panicked: {}", e);
            report(WipeStatus::Failed, 0, 0, Some(format!("wipe worker failed: {}", e))).await;
        }
    }

    guard.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn populate(dir: &Path, files: usize) {
        fs::create_dir_all(dir.join("nested")).unwrap();
        for i in 0..files {
            fs::write(dir.join(format!("file{}.txt", i)), b"secret").unwrap();
        }
        fs::write(dir.join("nested/deep.txt"), b"secret").unwrap();
    }

    #[test]
    fn test_count_matches_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("secrets");
        populate(&target, 3);

        let paths = vec![target.to_string_lossy().into_owned()];
        let counted = count_items(&paths);
        let summary = delete_paths(&paths, |_, _| {});

        assert_eq!(summary.files_deleted, counted);
        assert!(summary.errors.is_empty());
        assert!(!target.exists());
    }

    #[test]
    fn test_delete_reports_progress() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("bulk");
        fs::create_dir_all(&target).unwrap();
        for i in 0..60 {
            fs::write(target.join(format!("f{}.bin", i)), b"x").unwrap();
        }

        let mut reports = Vec::new();
        delete_paths(&[target.to_string_lossy().into_owned()], |deleted, total| {
            reports.push((deleted, total));
        });

        // 61 items (60 files + the directory): progress at 25 and 50
        assert_eq!(reports, vec![(25, 61), (50, 61)]);
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let summary = delete_paths(&["/nonexistent/warden-test-path".to_string()], |_, _| {});
        assert_eq!(summary.files_deleted, 0);
        assert!(summary.errors.is_empty());
    }

    /// Approved `{secrets}`, requested `[secrets, /etc]`: only the approved
    /// tree is deleted and the operation completes.
    #[test]
    fn test_scenario_partial_rejection_completes() {
        let tmp = tempfile::tempdir().unwrap();
        let secrets = tmp.path().join("data").join("secrets");
        populate(&secrets, 2);
        let secrets_str = secrets.to_string_lossy().into_owned();

        let approved = vec![secrets_str.clone()];
        let requested = vec![secrets_str.clone(), "/etc".to_string()];

        let (accepted, rejected) = safety::partition_wipe_paths(&requested, &approved);
        assert_eq!(accepted, vec![secrets_str]);
        assert_eq!(rejected.len(), 1);

        let expected = count_items(&accepted);
        let summary = delete_paths(&accepted, |_, _| {});
        assert_eq!(summary.files_deleted, expected);
        assert!(!secrets.exists());

        let (status, message) = compose_outcome(&rejected, Some(&summary));
        assert_eq!(status, WipeStatus::Completed);
        let message = message.unwrap();
        assert!(message.contains("/etc"));
        assert!(message.contains("rejected"));
    }

    #[test]
    fn test_all_rejected_fails_without_deleting() {
        let rejected = vec![
            ("/etc".to_string(), "inside blocked system prefix /etc".to_string()),
            ("/home/x".to_string(), "outside the approved folder set".to_string()),
        ];
        let (status, message) = compose_outcome(&rejected, None);
        assert_eq!(status, WipeStatus::Failed);
        assert!(message.unwrap().contains("All requested paths rejected"));
    }

    #[test]
    fn test_clean_completion_has_no_error_message() {
        let summary = WipeSummary { files_deleted: 4, total_items: 4, errors: vec![] };
        let (status, message) = compose_outcome(&[], Some(&summary));
        assert_eq!(status, WipeStatus::Completed);
        assert!(message.is_none());
    }
}
