//! SQLite-backed device state store.
//!
//! Canonical record of device identity, ownership, status, and
//! configuration. Every status mutation flows through a store method invoked
//! by the agent's reports or the geofence paths; dashboard handlers never
//! poke the status column directly.
//!
//! Concurrency model: one bundled SQLite connection behind a mutex. The
//! single-active-wipe invariant is a conditional check inside
//! [`DeviceStore::create_wipe`] while the lock is held, which is all the
//! mutual exclusion a single-row-update workload needs.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Error as SqliteError, OptionalExtension, Row};
use std::path::Path;

use warden_types::models::{
    ApprovedFolder, Device, DeviceStatus, GeofenceConfig, GeofenceMode, WipeOperation, WipeStatus,
};
use warden_types::protocol::{
    RegisterRequest, SetGeofenceRequest, StatusReport, WipeProgressReport,
};
use warden_types::{DeviceError, WipeError};

use crate::error::StoreError;
use crate::modules::geofence;

/// One audit-trail entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub id: i64,
    pub device_id: String,
    pub action: String,
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Device state store over a single SQLite database file.
pub struct DeviceStore {
    conn: Mutex<Connection>,
}

const DEVICE_COLUMNS: &str = "device_id, fingerprint_hash, name, owner_id, status, is_missing, \
     hostname, os_name, os_version, architecture, serial_number, mac_addresses, \
     last_seen, last_lat, last_lng, current_wifi_ssid, \
     unlock_password, lock_message, pending_message, \
     geofence_enabled, geofence_mode, geofence_wifi_ssid, geofence_signal_threshold_percent, \
     geofence_center_lat, geofence_center_lng, geofence_radius_m, was_inside_geofence, \
     registered_at";

fn add_column_if_missing(conn: &Connection, statement: &str) -> Result<(), SqliteError> {
    match conn.execute(statement, []) {
        Ok(_) => Ok(()),
        Err(SqliteError::SqliteFailure(_, Some(message)))
            if message.contains("duplicate column name") =>
        {
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn now_ts() -> i64 {
    Utc::now().timestamp()
}

fn ts_to_datetime(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

fn device_from_row(row: &Row<'_>) -> Result<Device, SqliteError> {
    let status_raw: String = row.get(4)?;
    let status = DeviceStatus::parse(&status_raw).ok_or_else(|| {
        SqliteError::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(DeviceError::InvalidStatus { value: status_raw.clone() }),
        )
    })?;

    let mac_json: Option<String> = row.get(11)?;
    let mac_addresses = mac_json
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default();

    let mode_raw: Option<String> = row.get(20)?;
    let mode = match mode_raw.as_deref() {
        Some("location") => GeofenceMode::Location,
        _ => GeofenceMode::Wifi,
    };

    Ok(Device {
        device_id: row.get(0)?,
        fingerprint_hash: row.get(1)?,
        name: row.get(2)?,
        owner_id: row.get(3)?,
        status,
        is_missing: row.get::<_, i64>(5)? != 0,
        hostname: row.get(6)?,
        os_name: row.get(7)?,
        os_version: row.get(8)?,
        architecture: row.get(9)?,
        serial_number: row.get(10)?,
        mac_addresses,
        last_seen: ts_to_datetime(row.get(12)?),
        last_lat: row.get(13)?,
        last_lng: row.get(14)?,
        current_wifi_ssid: row.get(15)?,
        unlock_password: row.get(16)?,
        lock_message: row.get(17)?,
        pending_message: row.get(18)?,
        geofence: GeofenceConfig {
            enabled: row.get::<_, i64>(19)? != 0,
            mode,
            wifi_ssid: row.get(21)?,
            signal_threshold_percent: row.get(22)?,
            center_lat: row.get(23)?,
            center_lng: row.get(24)?,
            radius_m: row.get(25)?,
        },
        was_inside_geofence: row.get::<_, i64>(26)? != 0,
        registered_at: ts_to_datetime(row.get(27)?),
    })
}

fn wipe_from_row(row: &Row<'_>) -> Result<WipeOperation, SqliteError> {
    let status_raw: String = row.get(3)?;
    let status = WipeStatus::parse(&status_raw).unwrap_or(WipeStatus::Failed);
    let paths_json: String = row.get(2)?;
    let requested_paths = serde_json::from_str(&paths_json).unwrap_or_default();

    Ok(WipeOperation {
        id: row.get(0)?,
        device_id: row.get(1)?,
        requested_paths,
        status,
        files_deleted: row.get::<_, i64>(4)?.max(0) as u64,
        total_files: row.get::<_, i64>(5)?.max(0) as u64,
        error_message: row.get(6)?,
        started_at: ts_to_datetime(row.get(7)?),
        completed_at: ts_to_datetime(row.get(8)?),
        created_at: ts_to_datetime(row.get(9)?).unwrap_or_else(Utc::now),
    })
}

const WIPE_COLUMNS: &str = "id, device_id, requested_paths, status, files_deleted, total_files, \
     error_message, started_at, completed_at, created_at";

impl DeviceStore {
    /// Open (creating if necessary) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> Result<(), SqliteError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS devices (
                device_id TEXT PRIMARY KEY,
                fingerprint_hash TEXT,
                name TEXT NOT NULL,
                owner_id INTEGER,
                status TEXT NOT NULL DEFAULT 'active',
                is_missing INTEGER NOT NULL DEFAULT 0,
                hostname TEXT,
                os_name TEXT,
                os_version TEXT,
                architecture TEXT,
                serial_number TEXT,
                mac_addresses TEXT,
                last_seen INTEGER,
                last_lat REAL,
                last_lng REAL,
                current_wifi_ssid TEXT,
                unlock_password TEXT,
                lock_message TEXT,
                pending_message TEXT,
                geofence_enabled INTEGER NOT NULL DEFAULT 0,
                geofence_mode TEXT NOT NULL DEFAULT 'wifi',
                geofence_wifi_ssid TEXT,
                geofence_signal_threshold_percent INTEGER,
                geofence_center_lat REAL,
                geofence_center_lng REAL,
                geofence_radius_m REAL,
                was_inside_geofence INTEGER NOT NULL DEFAULT 1,
                registered_at INTEGER
            )",
            [],
        )?;

        // Columns that postdate the first schema revision
        add_column_if_missing(conn, "ALTER TABLE devices ADD COLUMN current_wifi_ssid TEXT")?;
        add_column_if_missing(conn, "ALTER TABLE devices ADD COLUMN pending_message TEXT")?;
        add_column_if_missing(
            conn,
            "ALTER TABLE devices ADD COLUMN geofence_signal_threshold_percent INTEGER",
        )?;

        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_devices_fingerprint
             ON devices (fingerprint_hash) WHERE fingerprint_hash IS NOT NULL",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS approved_folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                folder_path TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS wipe_operations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                requested_paths TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                files_deleted INTEGER NOT NULL DEFAULT 0,
                total_files INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                started_at INTEGER,
                completed_at INTEGER,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_wipe_device ON wipe_operations (device_id, status)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS activity_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                action TEXT NOT NULL,
                description TEXT NOT NULL,
                lat REAL,
                lng REAL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn log_activity_locked(
        conn: &Connection,
        device_id: &str,
        action: &str,
        description: &str,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<(), SqliteError> {
        conn.execute(
            "INSERT INTO activity_logs (device_id, action, description, lat, lng, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![device_id, action, description, lat, lng, now_ts()],
        )?;
        Ok(())
    }

    fn get_device_locked(conn: &Connection, device_id: &str) -> Result<Device, StoreError> {
        conn.query_row(
            &format!("SELECT {} FROM devices WHERE device_id = ?1", DEVICE_COLUMNS),
            params![device_id],
            device_from_row,
        )
        .optional()?
        .ok_or_else(|| DeviceError::NotFound { device_id: device_id.to_string() }.into())
    }

    // ------------------------------------------------------------------
    // Registration & linking
    // ------------------------------------------------------------------

    /// Agent-first registration: look up by fingerprint, create an unowned
    /// device when unknown. Idempotent — registering the same fingerprint
    /// twice returns the same `device_id` and creates no duplicate.
    ///
    /// Returns the device and whether it was newly created.
    pub fn register_agent(&self, req: &RegisterRequest) -> Result<(Device, bool), StoreError> {
        if req.fingerprint_hash.trim().is_empty() {
            return Err(DeviceError::MissingFingerprint.into());
        }

        let conn = self.conn.lock();

        let existing = conn
            .query_row(
                &format!("SELECT {} FROM devices WHERE fingerprint_hash = ?1", DEVICE_COLUMNS),
                params![req.fingerprint_hash],
                device_from_row,
            )
            .optional()?;

        if let Some(device) = existing {
            conn.execute(
                "UPDATE devices SET last_seen = ?1 WHERE device_id = ?2",
                params![now_ts(), device.device_id],
            )?;
            let device = Self::get_device_locked(&conn, &device.device_id)?;
            return Ok((device, false));
        }

        let device_id = Self::generate_device_id_locked(&conn, req)?;
        let name = Self::compose_name(req, &device_id);
        let mac_json = serde_json::to_string(&req.mac_addresses).unwrap_or_else(|_| "[]".into());

        conn.execute(
            "INSERT INTO devices (device_id, fingerprint_hash, name, owner_id, status,
                 hostname, os_name, os_version, architecture, serial_number, mac_addresses,
                 last_seen, registered_at)
             VALUES (?1, ?2, ?3, NULL, 'active', ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                device_id,
                req.fingerprint_hash,
                name,
                req.hostname,
                req.os_name,
                req.os_version,
                req.architecture,
                req.serial_number,
                mac_json,
                now_ts(),
            ],
        )?;

        Self::log_activity_locked(
            &conn,
            &device_id,
            "device_registered",
            &format!("Device \"{}\" registered by agent (unowned, awaiting user link)", name),
            None,
            None,
        )?;

        let device = Self::get_device_locked(&conn, &device_id)?;
        Ok((device, true))
    }

    /// `{hostname}-{serial prefix}` when a serial exists, else
    /// `device-{fingerprint prefix}`, suffixed until unique.
    fn generate_device_id_locked(
        conn: &Connection,
        req: &RegisterRequest,
    ) -> Result<String, StoreError> {
        let hostname = req.hostname.as_deref().unwrap_or("device");
        let base = match req.serial_number.as_deref() {
            Some(serial) if !serial.is_empty() => {
                let prefix: String = serial.chars().take(8).collect();
                format!("{}-{}", hostname, prefix)
            }
            _ => {
                let prefix: String = req.fingerprint_hash.chars().take(16).collect();
                format!("device-{}", prefix)
            }
        };

        let mut candidate = base.clone();
        let mut counter = 1;
        loop {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM devices WHERE device_id = ?1",
                    params![candidate],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Ok(candidate);
            }
            candidate = format!("{}-{}", base, counter);
            counter += 1;
        }
    }

    fn compose_name(req: &RegisterRequest, device_id: &str) -> String {
        let mut name = req
            .model
            .clone()
            .or_else(|| req.hostname.clone())
            .unwrap_or_else(|| device_id.to_string());
        if let Some(vendor) = &req.vendor {
            name = format!("{} {}", vendor, name);
        }
        if let Some(os_name) = &req.os_name {
            name = format!("{} – {}", name, os_name);
        }
        name
    }

    pub fn get_device(&self, device_id: &str) -> Result<Device, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)
    }

    pub fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Device>, StoreError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM devices WHERE fingerprint_hash = ?1", DEVICE_COLUMNS),
                params![fingerprint],
                device_from_row,
            )
            .optional()?)
    }

    pub fn device_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM devices", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Link an *unowned* device to an account. Linking an owned device fails
    /// with a conflict — ownership is never silently reassigned.
    pub fn link_owner(
        &self,
        owner_id: i64,
        device_id: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Result<Device, StoreError> {
        let conn = self.conn.lock();

        let device = match (device_id, fingerprint) {
            (Some(id), _) => Self::get_device_locked(&conn, id)?,
            (None, Some(fp)) => conn
                .query_row(
                    &format!("SELECT {} FROM devices WHERE fingerprint_hash = ?1", DEVICE_COLUMNS),
                    params![fp],
                    device_from_row,
                )
                .optional()?
                .ok_or(DeviceError::NotFound { device_id: fp.to_string() })?,
            (None, None) => return Err(DeviceError::MissingLinkSelector.into()),
        };

        if device.is_owned() {
            return Err(DeviceError::AlreadyOwned { device_id: device.device_id }.into());
        }

        conn.execute(
            "UPDATE devices SET owner_id = ?1 WHERE device_id = ?2",
            params![owner_id, device.device_id],
        )?;
        Self::log_activity_locked(
            &conn,
            &device.device_id,
            "device_linked",
            &format!("Device \"{}\" linked to owner {}", device.name, owner_id),
            None,
            None,
        )?;

        Self::get_device_locked(&conn, &device.device_id)
    }

    // ------------------------------------------------------------------
    // Owner commands
    // ------------------------------------------------------------------

    /// Owner lock command: status plus the parameters the lock screen needs.
    pub fn lock_device(
        &self,
        device_id: &str,
        password: &str,
        message: Option<&str>,
    ) -> Result<Device, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;
        conn.execute(
            "UPDATE devices SET status = 'locked', unlock_password = ?1, lock_message = ?2
             WHERE device_id = ?3",
            params![password, message, device_id],
        )?;
        Self::log_activity_locked(
            &conn,
            device_id,
            "lock",
            "Remote lock triggered by owner",
            None,
            None,
        )?;
        Self::get_device_locked(&conn, device_id)
    }

    pub fn trigger_alarm(&self, device_id: &str) -> Result<Device, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;
        conn.execute(
            "UPDATE devices SET status = 'alarm' WHERE device_id = ?1",
            params![device_id],
        )?;
        Self::log_activity_locked(
            &conn,
            device_id,
            "alarm",
            "Remote alarm triggered by owner",
            None,
            None,
        )?;
        Self::get_device_locked(&conn, device_id)
    }

    /// Clear an alarm without requiring unlock. No-op when the device is not
    /// alarming.
    pub fn clear_alarm(&self, device_id: &str) -> Result<Device, StoreError> {
        let conn = self.conn.lock();
        let device = Self::get_device_locked(&conn, device_id)?;
        if device.status == DeviceStatus::Alarm {
            conn.execute(
                "UPDATE devices SET status = 'active' WHERE device_id = ?1",
                params![device_id],
            )?;
            Self::log_activity_locked(
                &conn,
                device_id,
                "alarm_cleared",
                "Alarm manually cleared by owner",
                None,
                None,
            )?;
        }
        Self::get_device_locked(&conn, device_id)
    }

    /// Queue a one-shot message for the agent to display.
    pub fn set_message(&self, device_id: &str, text: &str) -> Result<Device, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;
        conn.execute(
            "UPDATE devices SET pending_message = ?1 WHERE device_id = ?2",
            params![text, device_id],
        )?;
        Self::log_activity_locked(
            &conn,
            device_id,
            "message",
            "Owner message queued for display",
            None,
            None,
        )?;
        Self::get_device_locked(&conn, device_id)
    }

    /// Agent acknowledged the one-shot message.
    pub fn ack_message(&self, device_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE devices SET pending_message = NULL WHERE device_id = ?1",
            params![device_id],
        )?;
        if updated == 0 {
            return Err(DeviceError::NotFound { device_id: device_id.to_string() }.into());
        }
        Ok(())
    }

    pub fn set_geofence(&self, req: &SetGeofenceRequest) -> Result<Device, StoreError> {
        let conn = self.conn.lock();
        let device = Self::get_device_locked(&conn, &req.device_id)?;

        let config = &device.geofence;
        let enabled = req.enabled.unwrap_or(config.enabled);
        let mode = req.mode.unwrap_or(config.mode);
        let wifi_ssid = req.wifi_ssid.clone().or_else(|| config.wifi_ssid.clone());
        let threshold = req.signal_threshold_percent.or(config.signal_threshold_percent);
        let center_lat = req.center_lat.or(config.center_lat);
        let center_lng = req.center_lng.or(config.center_lng);
        let radius_m = req.radius_m.or(config.radius_m);

        // Location mode starts its breach tracking from the device's current
        // position when one is known; WiFi mode assumes in-range and lets the
        // agent correct it.
        let was_inside = match (mode, enabled) {
            (GeofenceMode::Location, true) => {
                match (device.last_lat, device.last_lng, center_lat, center_lng, radius_m) {
                    (Some(lat), Some(lng), Some(clat), Some(clng), Some(radius)) => {
                        geofence::haversine_meters(clat, clng, lat, lng) <= radius
                    }
                    _ => true,
                }
            }
            _ => true,
        };

        let mode_str = match mode {
            GeofenceMode::Wifi => "wifi",
            GeofenceMode::Location => "location",
        };

        conn.execute(
            "UPDATE devices SET geofence_enabled = ?1, geofence_mode = ?2,
                 geofence_wifi_ssid = ?3, geofence_signal_threshold_percent = ?4,
                 geofence_center_lat = ?5, geofence_center_lng = ?6, geofence_radius_m = ?7,
                 was_inside_geofence = ?8
             WHERE device_id = ?9",
            params![
                enabled as i64,
                mode_str,
                wifi_ssid,
                threshold,
                center_lat,
                center_lng,
                radius_m,
                was_inside as i64,
                req.device_id,
            ],
        )?;

        Self::log_activity_locked(
            &conn,
            &req.device_id,
            "geofence_updated",
            &format!(
                "Geofence {}: mode={}",
                if enabled { "enabled" } else { "disabled" },
                mode_str
            ),
            None,
            None,
        )?;

        Self::get_device_locked(&conn, &req.device_id)
    }

    // ------------------------------------------------------------------
    // Agent reports
    // ------------------------------------------------------------------

    /// Record a status report: heartbeat, SSID/location sample, and any
    /// agent-side status change. Location-mode geofences are evaluated here,
    /// on the server, since the agent may have no notion of its position
    /// accuracy.
    pub fn record_report(&self, report: &StatusReport) -> Result<Device, StoreError> {
        let conn = self.conn.lock();
        let device = Self::get_device_locked(&conn, &report.device_id)?;

        let mut status = device.status;

        if let Some(reported) = report.status {
            if reported != device.status {
                match (device.status, reported) {
                    (DeviceStatus::Locked, DeviceStatus::Active) => {
                        Self::log_activity_locked(
                            &conn,
                            &report.device_id,
                            "unlock",
                            "Device unlocked locally",
                            None,
                            None,
                        )?;
                    }
                    (_, DeviceStatus::Alarm) => {
                        let description = report
                            .breach_reason
                            .clone()
                            .unwrap_or_else(|| "Agent raised alarm".to_string());
                        Self::log_activity_locked(
                            &conn,
                            &report.device_id,
                            "geofence_breach",
                            &description,
                            None,
                            None,
                        )?;
                    }
                    (DeviceStatus::Alarm, _) => {
                        Self::log_activity_locked(
                            &conn,
                            &report.device_id,
                            "alarm_cleared",
                            "Alarm cleared by agent report",
                            None,
                            None,
                        )?;
                    }
                    _ => {}
                }
            }
            status = reported;
        }

        let mut was_inside = device.was_inside_geofence;
        let (mut last_lat, mut last_lng) = (device.last_lat, device.last_lng);

        if let Some(fix) = report.location {
            last_lat = Some(fix.lat);
            last_lng = Some(fix.lng);

            // Server-side location-mode geofence evaluation
            let config = &device.geofence;
            if config.enabled && config.mode == GeofenceMode::Location {
                if let (Some(clat), Some(clng), Some(radius)) =
                    (config.center_lat, config.center_lng, config.radius_m)
                {
                    let distance = geofence::haversine_meters(clat, clng, fix.lat, fix.lng);
                    let inside = distance <= radius;

                    if was_inside && !inside {
                        status = DeviceStatus::Alarm;
                        Self::log_activity_locked(
                            &conn,
                            &report.device_id,
                            "geofence_breach",
                            &format!(
                                "Device left geofence: {:.0}m outside {:.0}m radius",
                                distance - radius,
                                radius
                            ),
                            Some(fix.lat),
                            Some(fix.lng),
                        )?;
                    } else if !was_inside && inside && status == DeviceStatus::Alarm {
                        status = DeviceStatus::Active;
                        Self::log_activity_locked(
                            &conn,
                            &report.device_id,
                            "alarm_cleared",
                            "Device returned inside geofence",
                            Some(fix.lat),
                            Some(fix.lng),
                        )?;
                    }
                    was_inside = inside;
                }
            }
        }

        let is_missing = device.is_missing && status != DeviceStatus::Active;
        let ssid = report.current_wifi_ssid.clone().or(device.current_wifi_ssid);

        conn.execute(
            "UPDATE devices SET status = ?1, is_missing = ?2, last_seen = ?3,
                 current_wifi_ssid = ?4, last_lat = ?5, last_lng = ?6, was_inside_geofence = ?7
             WHERE device_id = ?8",
            params![
                status.as_str(),
                is_missing as i64,
                now_ts(),
                ssid,
                last_lat,
                last_lng,
                was_inside as i64,
                report.device_id,
            ],
        )?;

        Self::get_device_locked(&conn, &report.device_id)
    }

    /// Record the outcome of a locally executed action in the audit trail.
    pub fn record_action_result(
        &self,
        device_id: &str,
        action: &str,
        success: bool,
        detail: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;
        let description = match (success, detail) {
            (true, Some(d)) => format!("Action {} executed: {}", action, d),
            (true, None) => format!("Action {} executed", action),
            (false, Some(d)) => format!("Action {} FAILED: {}", action, d),
            (false, None) => format!("Action {} FAILED", action),
        };
        Self::log_activity_locked(&conn, device_id, "action_result", &description, None, None)?;
        Ok(())
    }

    /// Mark devices not seen within the threshold as missing. Only `active`
    /// devices are swept; locked/alarming devices keep their state.
    ///
    /// Returns the affected device ids.
    pub fn mark_stale_missing(&self, threshold_secs: i64) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let cutoff = now_ts() - threshold_secs;

        let mut stmt = conn.prepare(
            "SELECT device_id FROM devices
             WHERE status = 'active' AND last_seen IS NOT NULL AND last_seen < ?1",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![cutoff], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        for device_id in &ids {
            conn.execute(
                "UPDATE devices SET status = 'missing', is_missing = 1 WHERE device_id = ?1",
                params![device_id],
            )?;
            Self::log_activity_locked(
                &conn,
                device_id,
                "marked_missing",
                "Device not seen within the offline threshold",
                None,
                None,
            )?;
        }

        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Approved folders
    // ------------------------------------------------------------------

    /// Replace the server's copy of the device's approved set wholesale.
    pub fn replace_approved_folders(
        &self,
        device_id: &str,
        folders: &[String],
    ) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;

        conn.execute("DELETE FROM approved_folders WHERE device_id = ?1", params![device_id])?;
        for folder in folders {
            conn.execute(
                "INSERT INTO approved_folders (device_id, folder_path, created_at)
                 VALUES (?1, ?2, ?3)",
                params![device_id, folder, now_ts()],
            )?;
        }
        Ok(folders.len())
    }

    pub fn approved_folders(&self, device_id: &str) -> Result<Vec<ApprovedFolder>, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;

        let mut stmt = conn.prepare(
            "SELECT id, device_id, folder_path, created_at FROM approved_folders
             WHERE device_id = ?1 ORDER BY folder_path",
        )?;
        let folders = stmt
            .query_map(params![device_id], |row| {
                Ok(ApprovedFolder {
                    id: row.get(0)?,
                    device_id: row.get(1)?,
                    folder_path: row.get(2)?,
                    created_at: ts_to_datetime(row.get(3)?).unwrap_or_else(Utc::now),
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(folders)
    }

    // ------------------------------------------------------------------
    // Wipe operations
    // ------------------------------------------------------------------

    /// Create a pending wipe operation. Validates the two server-side
    /// conditions: no other non-terminal operation, and at least one approved
    /// folder. Path membership is the agent's enforcement boundary.
    pub fn create_wipe(
        &self,
        device_id: &str,
        paths: &[String],
    ) -> Result<WipeOperation, StoreError> {
        if paths.is_empty() {
            return Err(WipeError::EmptySelection.into());
        }

        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;

        let folder_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM approved_folders WHERE device_id = ?1",
            params![device_id],
            |row| row.get(0),
        )?;
        if folder_count == 0 {
            return Err(WipeError::NoApprovedFolders { device_id: device_id.to_string() }.into());
        }

        let active: Option<i64> = conn
            .query_row(
                "SELECT id FROM wipe_operations
                 WHERE device_id = ?1 AND status IN ('pending', 'in_progress')
                 ORDER BY created_at DESC LIMIT 1",
                params![device_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(operation_id) = active {
            return Err(WipeError::OperationActive { operation_id }.into());
        }

        let paths_json = serde_json::to_string(paths).unwrap_or_else(|_| "[]".into());
        conn.execute(
            "INSERT INTO wipe_operations (device_id, requested_paths, status, created_at)
             VALUES (?1, ?2, 'pending', ?3)",
            params![device_id, paths_json, now_ts()],
        )?;
        let operation_id = conn.last_insert_rowid();

        let preview: Vec<&str> = paths.iter().take(3).map(String::as_str).collect();
        let mut description =
            format!("Wipe triggered for {} item(s): {}", paths.len(), preview.join(", "));
        if paths.len() > 3 {
            description.push_str(&format!(" ... (+{} more)", paths.len() - 3));
        }
        Self::log_activity_locked(&conn, device_id, "wipe_triggered", &description, None, None)?;

        conn.query_row(
            &format!("SELECT {} FROM wipe_operations WHERE id = ?1", WIPE_COLUMNS),
            params![operation_id],
            wipe_from_row,
        )
        .map_err(Into::into)
    }

    /// Newest operation for the device, terminal or not.
    pub fn latest_wipe(&self, device_id: &str) -> Result<Option<WipeOperation>, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM wipe_operations WHERE device_id = ?1
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    WIPE_COLUMNS
                ),
                params![device_id],
                wipe_from_row,
            )
            .optional()?)
    }

    /// Newest non-terminal operation, for the agent's pull.
    pub fn pending_wipe(&self, device_id: &str) -> Result<Option<WipeOperation>, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, device_id)?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM wipe_operations
                     WHERE device_id = ?1 AND status IN ('pending', 'in_progress')
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    WIPE_COLUMNS
                ),
                params![device_id],
                wipe_from_row,
            )
            .optional()?)
    }

    /// Apply an agent progress/terminal report. A fully successful
    /// completion moves the device to `wiped`; failures leave device status
    /// untouched (the operation row carries the error).
    pub fn update_wipe(&self, report: &WipeProgressReport) -> Result<WipeOperation, StoreError> {
        let conn = self.conn.lock();
        Self::get_device_locked(&conn, &report.device_id)?;

        let existing = conn
            .query_row(
                &format!(
                    "SELECT {} FROM wipe_operations WHERE id = ?1 AND device_id = ?2",
                    WIPE_COLUMNS
                ),
                params![report.operation_id, report.device_id],
                wipe_from_row,
            )
            .optional()?
            .ok_or(WipeError::OperationNotFound { operation_id: report.operation_id })?;

        let started_at = match (existing.started_at, report.status) {
            (None, WipeStatus::InProgress | WipeStatus::Completed | WipeStatus::Failed) => {
                Some(now_ts())
            }
            (Some(ts), _) => Some(ts.timestamp()),
            (None, WipeStatus::Pending) => None,
        };
        let completed_at = if report.status.is_terminal() { Some(now_ts()) } else { None };

        conn.execute(
            "UPDATE wipe_operations SET status = ?1, files_deleted = ?2, total_files = ?3,
                 error_message = COALESCE(?4, error_message), started_at = ?5, completed_at = ?6
             WHERE id = ?7",
            params![
                report.status.as_str(),
                report.files_deleted as i64,
                report.total_files as i64,
                report.error_message,
                started_at,
                completed_at,
                report.operation_id,
            ],
        )?;

        if existing.status != report.status {
            Self::log_activity_locked(
                &conn,
                &report.device_id,
                "wipe_status_update",
                &format!(
                    "Wipe operation {}: {}/{} files deleted",
                    report.status, report.files_deleted, report.total_files
                ),
                None,
                None,
            )?;
        }

        if report.status == WipeStatus::Completed && report.error_message.is_none() {
            conn.execute(
                "UPDATE devices SET status = 'wiped' WHERE device_id = ?1",
                params![report.device_id],
            )?;
        }

        conn.query_row(
            &format!("SELECT {} FROM wipe_operations WHERE id = ?1", WIPE_COLUMNS),
            params![report.operation_id],
            wipe_from_row,
        )
        .map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Activity log
    // ------------------------------------------------------------------

    pub fn log_activity(
        &self,
        device_id: &str,
        action: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        Self::log_activity_locked(&conn, device_id, action, description, None, None)?;
        Ok(())
    }

    pub fn recent_activity(
        &self,
        device_id: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, device_id, action, description, lat, lng, created_at
             FROM activity_logs WHERE device_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![device_id, limit as i64], |row| {
                Ok(ActivityEntry {
                    id: row.get(0)?,
                    device_id: row.get(1)?,
                    action: row.get(2)?,
                    description: row.get(3)?,
                    lat: row.get(4)?,
                    lng: row.get(5)?,
                    created_at: ts_to_datetime(row.get(6)?).unwrap_or_else(Utc::now),
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
