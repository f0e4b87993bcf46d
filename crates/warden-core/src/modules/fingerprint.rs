//! Hardware fingerprint generation for device identity.
//!
//! Builds a stable identity hash from whatever identifiers the host OS
//! exposes: machine/platform UUID, system serial number, sorted MAC
//! addresses, hostname, OS family. Identifiers are joined into a labeled
//! canonical string and digested with SHA-256; the hex digest is the
//! `fingerprint_hash` a device registers under.
//!
//! Stability requirements:
//! - deterministic across reboots on unchanged hardware
//! - unaffected by superficial changes (IP address, running processes)
//!
//! Known weakness: when no machine UUID, serial, or MAC is available the
//! fingerprint degrades to a hostname+OS composite, which is not unique
//! across identically named hosts. Registration proceeds anyway; the
//! [`FingerprintInfo`] quality summary makes the degradation visible in logs.

use serde::Serialize;
use sha2::{Digest, Sha256};
#[cfg(any(target_os = "macos", target_os = "windows"))]
use std::process::Command;

/// Identifiers collected from the host, strongest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierSet {
    /// Machine/platform UUID (systemd machine-id, IOPlatformUUID, wmic UUID)
    pub machine_uuid: Option<String>,
    /// System serial number, with vendor placeholders filtered out
    pub serial_number: Option<String>,
    /// Sorted, de-duplicated MAC addresses
    pub mac_addresses: Vec<String>,
    pub hostname: Option<String>,
    /// `std::env::consts::OS` family name
    pub os_family: String,
}

/// Quality summary logged at registration time.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FingerprintInfo {
    pub fingerprint_hash: String,
    pub os_family: String,
    pub hostname: Option<String>,
    pub has_machine_uuid: bool,
    pub has_serial: bool,
    pub mac_count: usize,
}

impl IdentifierSet {
    /// Collect identifiers from the running host. Never fails: missing
    /// sources just leave their field empty.
    pub fn collect() -> Self {
        let mut macs: Vec<String> = sysinfo::Networks::new_with_refreshed_list()
            .iter()
            .map(|(_, data)| data.mac_address().to_string())
            .filter(|mac| mac != "00:00:00:00:00:00")
            .collect();
        macs.sort();
        macs.dedup();

        let set = Self {
            machine_uuid: platform::machine_uuid(),
            serial_number: platform::serial_number().filter(|s| !is_placeholder_serial(s)),
            mac_addresses: macs,
            hostname: hostname::get().ok().map(|h| h.to_string_lossy().into_owned()),
            os_family: std::env::consts::OS.to_string(),
        };
        tracing::debug!(
            "collected identifiers: uuid={}, serial={}, macs={}",
            set.machine_uuid.is_some(),
            set.serial_number.is_some(),
            set.mac_addresses.len()
        );
        set
    }

    /// Canonical ordered string the digest is computed over.
    ///
    /// Exactly one machine-identifier part (the strongest available), then
    /// serial, MACs, hostname, OS family, labeled and joined with `|`.
    pub fn canonical_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(uuid) = &self.machine_uuid {
            parts.push(format!("uuid:{}", uuid));
        }
        if let Some(serial) = &self.serial_number {
            parts.push(format!("serial:{}", serial));
        }
        if !self.mac_addresses.is_empty() {
            parts.push(format!("macs:{}", self.mac_addresses.join("|")));
        }
        if let Some(hostname) = &self.hostname {
            parts.push(format!("hostname:{}", hostname));
        }
        parts.push(format!("os:{}", self.os_family));

        parts.join("|")
    }

    /// SHA-256 hex digest of the canonical string.
    pub fn fingerprint_hash(&self) -> String {
        let digest = Sha256::digest(self.canonical_string().as_bytes());
        hex::encode(digest)
    }

    /// Quality summary for registration logging.
    pub fn info(&self) -> FingerprintInfo {
        FingerprintInfo {
            fingerprint_hash: self.fingerprint_hash(),
            os_family: self.os_family.clone(),
            hostname: self.hostname.clone(),
            has_machine_uuid: self.machine_uuid.is_some(),
            has_serial: self.serial_number.is_some(),
            mac_count: self.mac_addresses.len(),
        }
    }
}

/// Vendor placeholder strings that must not be treated as serial numbers.
fn is_placeholder_serial(serial: &str) -> bool {
    let upper = serial.trim().to_uppercase();
    upper.is_empty()
        || matches!(upper.as_str(), "TO BE FILLED BY O.E.M." | "DEFAULT" | "NONE" | "UNKNOWN")
}

/// Run a command and return trimmed stdout, or None on any failure.
#[cfg(any(target_os = "macos", target_os = "windows"))]
fn run_cmd(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(target_os = "linux")]
mod platform {
    /// systemd machine-id, with the dbus path as fallback.
    pub fn machine_uuid() -> Option<String> {
        for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(content) = std::fs::read_to_string(path) {
                let id = content.trim();
                if !id.is_empty() {
                    return Some(id.to_string());
                }
            }
        }
        None
    }

    /// DMI product serial, world-readable on most distributions.
    pub fn serial_number() -> Option<String> {
        std::fs::read_to_string("/sys/class/dmi/id/product_serial")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::run_cmd;

    /// IOPlatformUUID from the IOKit registry.
    pub fn machine_uuid() -> Option<String> {
        let output = run_cmd("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])?;
        for line in output.lines() {
            if line.contains("IOPlatformUUID") {
                // "IOPlatformUUID" = "XXXXXXXX-..."
                let value = line.split('=').nth(1)?;
                return Some(value.trim().trim_matches('"').to_string());
            }
        }
        None
    }

    pub fn serial_number() -> Option<String> {
        let output = run_cmd("system_profiler", &["SPHardwareDataType"])?;
        for line in output.lines() {
            if line.contains("Serial Number (system):") {
                let value = line.split(':').nth(1)?;
                return Some(value.trim().to_string());
            }
        }
        None
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::run_cmd;

    fn wmic_field(args: &[&str], key: &str) -> Option<String> {
        let output = run_cmd("wmic", args)?;
        let prefix = format!("{}=", key);
        for line in output.lines() {
            if let Some(value) = line.trim().strip_prefix(&prefix) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        None
    }

    pub fn machine_uuid() -> Option<String> {
        wmic_field(&["csproduct", "get", "uuid", "/format:list"], "UUID")
    }

    pub fn serial_number() -> Option<String> {
        wmic_field(
            &["csproduct", "get", "identifyingnumber", "/format:list"],
            "IdentifyingNumber",
        )
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod platform {
    pub fn machine_uuid() -> Option<String> {
        None
    }

    pub fn serial_number() -> Option<String> {
        None
    }
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod fingerprint_tests;
