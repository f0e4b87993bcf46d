//! Agent-first registration.
//!
//! On first run the agent fingerprints its hardware and registers with the
//! server *before any user account exists*; the device is created unowned
//! and linked later through the dashboard flow. The returned `device_id` is
//! cached in the agent config so subsequent boots skip negotiation
//! entirely. Registration is idempotent server-side, so retrying after a
//! lost response is safe.

use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use warden_client::WardenClient;
use warden_core::IdentifierSet;
use warden_types::protocol::RegisterRequest;

use crate::config::AgentConfig;
use crate::discovery::SharedIdentity;

const INITIAL_RETRY_SECS: u64 = 5;
const MAX_RETRY_SECS: u64 = 60;

/// Build the registration payload from collected identifiers and OS
/// metadata.
pub fn build_request(identifiers: &IdentifierSet) -> RegisterRequest {
    RegisterRequest {
        fingerprint_hash: identifiers.fingerprint_hash(),
        agent_version: env!("CARGO_PKG_VERSION").to_string(),
        hostname: identifiers.hostname.clone(),
        os_name: sysinfo::System::name(),
        os_version: sysinfo::System::os_version(),
        architecture: Some(std::env::consts::ARCH.to_string()),
        vendor: None,
        model: None,
        serial_number: identifiers.serial_number.clone(),
        mac_addresses: identifiers.mac_addresses.clone(),
    }
}

/// Ensure this device is registered, retrying with capped backoff until the
/// server answers. Returns the device id.
pub async fn ensure_registered(
    client: &WardenClient,
    config: &mut AgentConfig,
    config_path: &Path,
    identity: &SharedIdentity,
) -> String {
    if let Some(device_id) = config.device_id.clone() {
        info!("[Registration] Device already registered: {}", device_id);
        publish_identity(identity, &device_id, config.fingerprint_hash.as_deref());
        return device_id;
    }

    let identifiers = IdentifierSet::collect();
    let quality = identifiers.info();
    info!(
        "[Registration] Fingerprint generated: {}... (uuid={}, serial={}, macs={})",
        &quality.fingerprint_hash[..16.min(quality.fingerprint_hash.len())],
        quality.has_machine_uuid,
        quality.has_serial,
        quality.mac_count
    );

    let request = build_request(&identifiers);
    let mut delay = INITIAL_RETRY_SECS;

    loop {
        match client.register(&request).await {
            Ok(response) => {
                info!(
                    "[Registration] Device registered: {} ({})",
                    response.device_id,
                    if response.user_linked { "linked to user" } else { "unowned, awaiting link" }
                );

                config.device_id = Some(response.device_id.clone());
                config.fingerprint_hash = Some(request.fingerprint_hash.clone());
                if let Err(e) = config.save(config_path) {
                    warn!("[Registration] Could not persist device_id: {}", e);
                }

                publish_identity(identity, &response.device_id, Some(&request.fingerprint_hash));
                return response.device_id;
            }
            Err(e) => {
                warn!("[Registration] Failed ({}), retrying in {}s", e, delay);
                tokio::time::sleep(Duration::from_secs(delay)).await;
                delay = (delay * 2).min(MAX_RETRY_SECS);
            }
        }
    }
}

fn publish_identity(identity: &SharedIdentity, device_id: &str, fingerprint: Option<&str>) {
    let mut guard = identity.write().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.device_id = Some(device_id.to_string());
    guard.fingerprint_hash = fingerprint.map(str::to_string);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_uses_fingerprint() {
        let identifiers = IdentifierSet {
            machine_uuid: Some("uuid-1".to_string()),
            serial_number: Some("SER123".to_string()),
            mac_addresses: vec!["aa:bb:cc:dd:ee:ff".to_string()],
            hostname: Some("host".to_string()),
            os_family: "linux".to_string(),
        };

        let request = build_request(&identifiers);
        assert_eq!(request.fingerprint_hash, identifiers.fingerprint_hash());
        assert_eq!(request.serial_number.as_deref(), Some("SER123"));
        assert_eq!(request.mac_addresses.len(), 1);
        assert!(!request.agent_version.is_empty());
    }
}
