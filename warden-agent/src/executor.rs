//! Command executor: turns observed status transitions into local actions.
//!
//! The executor compares each fetched snapshot against the last status it
//! applied itself, so a status that stays `locked` across N polls executes
//! the lock exactly once. A failed action leaves the applied status
//! untouched — the next poll observes the same transition and retries.
//!
//! State machine: `Idle → Executing(action) → Reported`, back to `Idle` once
//! the outcome has been reported to the server.

use std::sync::Arc;
use tracing::{info, warn};

use warden_types::models::DeviceStatus;
use warden_types::protocol::DeviceSnapshot;

use crate::surface::ActionSurface;

/// Executor phase, advanced by [`CommandExecutor::observe`] and closed out by
/// [`CommandExecutor::mark_reported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorPhase {
    Idle,
    Executing(&'static str),
    Reported(&'static str),
}

/// What one observation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// An action ran; report success upstream
    Executed(&'static str),
    /// An action could not start; report failure, retry on the next poll
    Failed {
        action: &'static str,
        detail: String,
    },
    /// The server cleared an alarm (owner action or geofence recovery)
    AlarmCleared,
    /// No transition
    NoOp,
}

pub struct CommandExecutor {
    surface: Arc<dyn ActionSurface>,
    /// Last status this agent observed and successfully applied
    last_applied: DeviceStatus,
    phase: ExecutorPhase,
}

impl CommandExecutor {
    pub fn new(surface: Arc<dyn ActionSurface>) -> Self {
        Self { surface, last_applied: DeviceStatus::Active, phase: ExecutorPhase::Idle }
    }

    pub fn last_applied(&self) -> DeviceStatus {
        self.last_applied
    }

    pub fn phase(&self) -> ExecutorPhase {
        self.phase
    }

    /// The poller reported the last outcome.
    pub fn mark_reported(&mut self) {
        if let ExecutorPhase::Executing(action) = self.phase {
            self.phase = ExecutorPhase::Reported(action);
        }
    }

    /// Detect a local unlock: the lock screen came down without the server
    /// knowing. Returns true when the agent should report `active`.
    pub fn check_local_unlock(&mut self) -> bool {
        if self.last_applied == DeviceStatus::Locked && !self.surface.lock_active() {
            info!("Lock screen dismissed locally, reporting active");
            self.last_applied = DeviceStatus::Active;
            true
        } else {
            false
        }
    }

    /// Handle one fetched snapshot. Detects the transition (not the level)
    /// and dispatches the corresponding local action.
    pub fn observe(&mut self, snapshot: &DeviceSnapshot) -> ExecutionOutcome {
        self.phase = ExecutorPhase::Idle;
        let fetched = snapshot.status;
        if fetched == self.last_applied {
            return ExecutionOutcome::NoOp;
        }

        info!("Status transition observed: {} -> {}", self.last_applied, fetched);

        match fetched {
            DeviceStatus::Locked => {
                self.phase = ExecutorPhase::Executing("lock");
                let Some(password) = snapshot.unlock_password.as_deref() else {
                    // Locking without a password would lock the owner out too
                    warn!("Lock command without an unlock password, refusing");
                    return ExecutionOutcome::Failed {
                        action: "lock",
                        detail: "no unlock password provided".to_string(),
                    };
                };
                match self.surface.begin_lock(password, snapshot.lock_message.as_deref()) {
                    Ok(()) => {
                        self.last_applied = DeviceStatus::Locked;
                        ExecutionOutcome::Executed("lock")
                    }
                    Err(detail) => {
                        warn!("Lock surface failed to start: {}", detail);
                        ExecutionOutcome::Failed { action: "lock", detail }
                    }
                }
            }
            DeviceStatus::Alarm => {
                self.phase = ExecutorPhase::Executing("alarm");
                match self.surface.begin_alarm() {
                    Ok(()) => {
                        self.last_applied = DeviceStatus::Alarm;
                        ExecutionOutcome::Executed("alarm")
                    }
                    Err(detail) => {
                        warn!("Alarm surface failed to start: {}", detail);
                        ExecutionOutcome::Failed { action: "alarm", detail }
                    }
                }
            }
            other => {
                // Transition away from a local effect
                let was = self.last_applied;
                self.last_applied = other;
                if was == DeviceStatus::Alarm {
                    self.surface.end_alarm();
                    return ExecutionOutcome::AlarmCleared;
                }
                ExecutionOutcome::NoOp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use warden_types::models::GeofenceConfig;

    /// Recording fake surface.
    #[derive(Default)]
    struct FakeSurface {
        lock_calls: AtomicUsize,
        alarm_calls: AtomicUsize,
        alarm_stops: AtomicUsize,
        locked: AtomicBool,
        fail_lock: AtomicBool,
    }

    impl ActionSurface for FakeSurface {
        fn begin_lock(&self, _password: &str, _message: Option<&str>) -> Result<(), String> {
            if self.fail_lock.load(Ordering::SeqCst) {
                return Err("no display".to_string());
            }
            self.lock_calls.fetch_add(1, Ordering::SeqCst);
            self.locked.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn lock_active(&self) -> bool {
            self.locked.load(Ordering::SeqCst)
        }

        fn begin_alarm(&self) -> Result<(), String> {
            self.alarm_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn end_alarm(&self) {
            self.alarm_stops.fetch_add(1, Ordering::SeqCst);
        }

        fn show_message(&self, _text: &str) -> Result<(), String> {
            Ok(())
        }
    }

    fn snapshot(status: DeviceStatus) -> DeviceSnapshot {
        DeviceSnapshot {
            device_id: "dev-1".to_string(),
            status,
            is_missing: false,
            unlock_password: Some("pw".to_string()),
            lock_message: None,
            pending_message: None,
            geofence: GeofenceConfig::default(),
        }
    }

    #[test]
    fn test_lock_executes_exactly_once_across_polls() {
        let surface = Arc::new(FakeSurface::default());
        let mut executor = CommandExecutor::new(surface.clone());

        // Status stays locked across five consecutive polls
        for _ in 0..5 {
            executor.observe(&snapshot(DeviceStatus::Locked));
        }
        assert_eq!(surface.lock_calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.last_applied(), DeviceStatus::Locked);
    }

    #[test]
    fn test_failed_lock_retries_next_poll() {
        let surface = Arc::new(FakeSurface::default());
        surface.fail_lock.store(true, Ordering::SeqCst);
        let mut executor = CommandExecutor::new(surface.clone());

        let outcome = executor.observe(&snapshot(DeviceStatus::Locked));
        assert!(matches!(outcome, ExecutionOutcome::Failed { action: "lock", .. }));
        // Applied status unchanged: the next poll sees the transition again
        assert_eq!(executor.last_applied(), DeviceStatus::Active);

        surface.fail_lock.store(false, Ordering::SeqCst);
        let outcome = executor.observe(&snapshot(DeviceStatus::Locked));
        assert_eq!(outcome, ExecutionOutcome::Executed("lock"));
        assert_eq!(surface.lock_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lock_without_password_fails() {
        let surface = Arc::new(FakeSurface::default());
        let mut executor = CommandExecutor::new(surface.clone());

        let mut snap = snapshot(DeviceStatus::Locked);
        snap.unlock_password = None;
        let outcome = executor.observe(&snap);
        assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));
        assert_eq!(surface.lock_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_alarm_clear_stops_local_alarm() {
        let surface = Arc::new(FakeSurface::default());
        let mut executor = CommandExecutor::new(surface.clone());

        executor.observe(&snapshot(DeviceStatus::Alarm));
        assert_eq!(surface.alarm_calls.load(Ordering::SeqCst), 1);

        // Server cleared the alarm
        let outcome = executor.observe(&snapshot(DeviceStatus::Active));
        assert_eq!(outcome, ExecutionOutcome::AlarmCleared);
        assert_eq!(surface.alarm_stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_local_unlock_detection() {
        let surface = Arc::new(FakeSurface::default());
        let mut executor = CommandExecutor::new(surface.clone());

        executor.observe(&snapshot(DeviceStatus::Locked));
        assert!(!executor.check_local_unlock());

        // User typed the right password; the surface came down
        surface.locked.store(false, Ordering::SeqCst);
        assert!(executor.check_local_unlock());
        assert_eq!(executor.last_applied(), DeviceStatus::Active);
    }

    #[test]
    fn test_phase_round_trip() {
        let surface = Arc::new(FakeSurface::default());
        let mut executor = CommandExecutor::new(surface);
        assert_eq!(executor.phase(), ExecutorPhase::Idle);

        executor.observe(&snapshot(DeviceStatus::Locked));
        assert_eq!(executor.phase(), ExecutorPhase::Executing("lock"));

        executor.mark_reported();
        assert_eq!(executor.phase(), ExecutorPhase::Reported("lock"));

        // Next uneventful observation returns to idle
        executor.observe(&snapshot(DeviceStatus::Locked));
        assert_eq!(executor.phase(), ExecutorPhase::Idle);
    }
}
