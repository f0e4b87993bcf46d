//! The command poll loop.
//!
//! One tick: fetch the canonical snapshot, hand status *transitions* to the
//! executor, display one-shot messages, evaluate the WiFi geofence, send the
//! periodic status report, and pull pending wipe/browse work. Network
//! failures are logged and swallowed — the next tick is the retry; the loop
//! never dies on a disconnect.
//!
//! Command delivery is last-write-wins: two owner commands inside one poll
//! interval collapse to the latest status, a disclosed simplification of the
//! pull-based protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use warden_client::WardenClient;
use warden_core::modules::geofence;
use warden_core::{BreachTracker, BreachTransition, GeofenceSample};
use warden_types::models::{DeviceStatus, GeofenceMode, WipeStatus};
use warden_types::protocol::{
    ActionResultReport, BrowseResultReport, DeviceSnapshot, StatusReport,
};

use crate::config::AgentConfig;
use crate::executor::{CommandExecutor, ExecutionOutcome};
use crate::surface::ActionSurface;
use crate::{browse, wifi, wipe};

pub struct Poller {
    client: WardenClient,
    config: AgentConfig,
    device_id: String,
    surface: Arc<dyn ActionSurface>,
    executor: CommandExecutor,
    tracker: BreachTracker,
    wipe_in_flight: Arc<AtomicBool>,
    last_report: Option<Instant>,
}

impl Poller {
    pub fn new(
        client: WardenClient,
        config: AgentConfig,
        device_id: String,
        surface: Arc<dyn ActionSurface>,
    ) -> Self {
        let executor = CommandExecutor::new(surface.clone());
        Self {
            client,
            config,
            device_id,
            surface,
            executor,
            tracker: BreachTracker::new(),
            wipe_in_flight: Arc::new(AtomicBool::new(false)),
            last_report: None,
        }
    }

    /// Run until the shutdown channel fires.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker =
            interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "[Poller] Started (poll every {}s, report every {}s)",
            self.config.poll_interval_secs, self.config.report_interval_secs
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    info!("[Poller] Shutdown requested, stopping");
                    break;
                }
            }
        }
    }

    /// One poll tick. Every failure path logs and returns; nothing here may
    /// take the loop down.
    async fn tick(&mut self) {
        let mut snapshot = match self.client.fetch_snapshot(&self.device_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("[Poller] Poll failed, retrying next tick: {}", e);
                return;
            }
        };

        // Local unlock beats everything else: the owner typed the password,
        // tell the server before acting on stale status.
        if self.executor.check_local_unlock() {
            self.send_report(Some(DeviceStatus::Active), None, None).await;
        }

        // The offline sweep marked us missing; a live poll is proof to the
        // contrary
        if snapshot.status == DeviceStatus::Missing {
            info!("[Poller] Server has this device as missing, reporting back active");
            if let Some(updated) = self.send_report(Some(DeviceStatus::Active), None, None).await {
                snapshot = updated;
            }
        }

        self.dispatch(&snapshot).await;

        if let Some(text) = &snapshot.pending_message {
            match self.surface.show_message(text) {
                Ok(()) => {
                    if let Err(e) = self.client.ack_message(&self.device_id).await {
                        warn!("[Poller] Message ack failed: {}", e);
                    }
                }
                Err(e) => warn!("[Poller] Could not display message: {}", e),
            }
        }

        let mut sampled_ssid: Option<String> = None;
        if snapshot.geofence.enabled && snapshot.geofence.mode == GeofenceMode::Wifi {
            sampled_ssid = self.check_wifi_geofence(&snapshot).await;
        }

        let report_due = self
            .last_report
            .map_or(true, |at| at.elapsed().as_secs() >= self.config.report_interval_secs);
        if report_due {
            let ssid = match sampled_ssid {
                Some(ssid) => Some(ssid),
                None => wifi::sample().ssid,
            };
            self.send_report(None, ssid, None).await;
        }

        self.check_pending_wipe().await;
        self.check_pending_browse().await;
    }

    /// Feed one snapshot to the executor and report the outcome.
    async fn dispatch(&mut self, snapshot: &DeviceSnapshot) {
        match self.executor.observe(snapshot) {
            ExecutionOutcome::Executed(action) => {
                self.report_action(action, true, None).await;
                self.executor.mark_reported();
            }
            ExecutionOutcome::Failed { action, detail } => {
                self.report_action(action, false, Some(detail)).await;
            }
            ExecutionOutcome::AlarmCleared => {
                // Manual clear resets the breach episode; a still-breached
                // sample starts a fresh one
                self.tracker.reset();
            }
            ExecutionOutcome::NoOp => {}
        }
    }

    /// Sample WiFi and run the breach episode machine. Returns the sampled
    /// SSID for reuse in the heartbeat.
    async fn check_wifi_geofence(&mut self, snapshot: &DeviceSnapshot) -> Option<String> {
        let sample = wifi::sample();
        let ssid = sample.ssid.clone();

        let verdict = geofence::evaluate(
            &snapshot.geofence,
            &GeofenceSample {
                ssid: sample.ssid,
                signal_percent: sample.signal_percent,
                location: None,
            },
        );

        match self.tracker.observe(verdict) {
            BreachTransition::Triggered(reason) => {
                warn!("[Geofence] BREACH: {}", reason);
                let updated = self
                    .send_report(
                        Some(DeviceStatus::Alarm),
                        ssid.clone(),
                        Some(reason.to_string()),
                    )
                    .await;
                // Start the local alarm immediately instead of waiting a tick
                if let Some(device) = updated {
                    self.dispatch(&device).await;
                }
            }
            BreachTransition::Cleared => {
                info!("[Geofence] Signal back in bounds");
                if snapshot.status == DeviceStatus::Alarm {
                    let updated =
                        self.send_report(Some(DeviceStatus::Active), ssid.clone(), None).await;
                    if let Some(device) = updated {
                        self.dispatch(&device).await;
                    }
                }
            }
            BreachTransition::Unchanged => {}
        }

        ssid
    }

    /// Post a status report; returns the server's post-update snapshot.
    async fn send_report(
        &mut self,
        status: Option<DeviceStatus>,
        ssid: Option<String>,
        breach_reason: Option<String>,
    ) -> Option<DeviceSnapshot> {
        let report = StatusReport {
            device_id: self.device_id.clone(),
            status,
            current_wifi_ssid: ssid,
            location: None,
            breach_reason,
        };
        match self.client.report(&report).await {
            Ok(response) => {
                self.last_report = Some(Instant::now());
                Some(response.device)
            }
            Err(e) => {
                warn!("[Poller] Status report failed: {}", e);
                None
            }
        }
    }

    async fn report_action(&self, action: &str, success: bool, detail: Option<String>) {
        let report = ActionResultReport {
            device_id: self.device_id.clone(),
            action: action.to_string(),
            success,
            detail,
        };
        if let Err(e) = self.client.report_action_result(&report).await {
            warn!("[Poller] Action result report failed: {}", e);
        }
    }

    /// Pull-based wipe dispatch. The in-flight guard keeps the agent at one
    /// wipe at a time no matter what the server hands out.
    async fn check_pending_wipe(&mut self) {
        if self.wipe_in_flight.load(Ordering::SeqCst) {
            return;
        }

        let pending = match self.client.pending_wipe(&self.device_id).await {
            Ok(pending) => pending,
            Err(e) => {
                debug!("[Poller] Pending-wipe check failed: {}", e);
                return;
            }
        };

        // `pending` covers a fresh trigger; `in_progress` with nothing in
        // flight here means a previous agent run died mid-wipe — resume it
        // so the operation can still reach a terminal state (already-deleted
        // paths simply no longer exist).
        if !pending.has_pending {
            return;
        }
        let Some(operation_id) = pending.operation_id else {
            return;
        };
        if pending.status == Some(WipeStatus::InProgress) {
            warn!("[Wipe] Resuming operation {} left in progress", operation_id);
        }

        warn!(
            "[Wipe] Pending wipe operation {} detected: {} path(s)",
            operation_id,
            pending.paths.len()
        );

        self.wipe_in_flight.store(true, Ordering::SeqCst);
        tokio::spawn(wipe::execute(
            self.client.clone(),
            self.device_id.clone(),
            operation_id,
            pending.paths,
            self.config.approved_folders.clone(),
            self.wipe_in_flight.clone(),
        ));
    }

    async fn check_pending_browse(&mut self) {
        let pending = match self.client.pending_browse(&self.device_id).await {
            Ok(pending) => pending,
            Err(e) => {
                debug!("[Poller] Pending-browse check failed: {}", e);
                return;
            }
        };

        if !pending.has_request {
            return;
        }
        let (Some(path), Some(request_id)) = (pending.path, pending.request_id) else {
            return;
        };

        info!("[Browse] Processing browse request: {}", path);

        let client = self.client.clone();
        let device_id = self.device_id.clone();
        let browse_root = self.config.browse_root.clone();

        tokio::spawn(async move {
            let result = match &browse_root {
                Some(root) => browse::list_directory(&path, root),
                None => Err("browsing is disabled on this device".to_string()),
            };
            let (items, error) = match result {
                Ok(items) => (items, None),
                Err(e) => (vec![], Some(e)),
            };

            let report = BrowseResultReport { device_id, request_id, path, items, error };
            if let Err(e) = client.submit_browse_result(&report).await {
                warn!("[Browse] Failed to send browse result: {}", e);
            }
        });
    }
}
