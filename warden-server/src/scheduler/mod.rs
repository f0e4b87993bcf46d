//! Background Schedulers
//!
//! ## Offline Sweep
//! Periodically marks active devices that have not reported within the
//! offline threshold as `missing`. Runs every 5 minutes; the threshold is a
//! CLI flag (default 24 hours).
//!
//! ## Browse Board Cleanup
//! The browse board holds ephemeral request/result entries for the
//! file-browse sub-protocol. Entries expire after 60 seconds; this task
//! purges them so an abandoned request never satisfies a later poll.

use std::time::Duration;
use tokio::time::interval;

use crate::state::AppState;

const SWEEP_INTERVAL_SECS: u64 = 300;
const BROWSE_CLEANUP_SECS: u64 = 30;

/// Start the offline sweep as a background tokio task.
pub fn start_offline_sweep(state: AppState, threshold_secs: u64) {
    tokio::spawn(async move {
        tracing::info!(
            "[Scheduler] Offline sweep started (threshold {}s)",
            threshold_secs
        );
        let mut sweep_interval = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            sweep_interval.tick().await;
            match state.store().mark_stale_missing(threshold_secs as i64) {
                Ok(swept) if !swept.is_empty() => {
                    tracing::warn!(
                        "[Scheduler] Marked {} device(s) missing: {}",
                        swept.len(),
                        swept.join(", ")
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("[Scheduler] Offline sweep failed: {}", e);
                }
            }
        }
    });
}

/// Start the browse board cleanup as a background tokio task.
pub fn start_browse_cleanup(state: AppState) {
    tokio::spawn(async move {
        let mut cleanup_interval = interval(Duration::from_secs(BROWSE_CLEANUP_SECS));
        loop {
            cleanup_interval.tick().await;
            let removed = state.cleanup_browse_board();
            if removed > 0 {
                tracing::debug!("[Scheduler] Cleaned up {} expired browse entries", removed);
            }
        }
    });
}
