//! Test helpers for warden-server unit tests.

use warden_core::DeviceStore;
use warden_types::protocol::RegisterRequest;

use crate::state::AppState;

/// Create a minimal `AppState` over an in-memory store.
pub fn test_app_state() -> AppState {
    let store = DeviceStore::open_in_memory().expect("failed to open in-memory store");
    AppState::new(store)
}

/// Registration payload with a distinct fingerprint.
pub fn register_request(fingerprint: &str) -> RegisterRequest {
    RegisterRequest {
        fingerprint_hash: fingerprint.to_string(),
        agent_version: "0.1.0".to_string(),
        hostname: Some("test-laptop".to_string()),
        os_name: Some("Linux".to_string()),
        os_version: Some("Ubuntu 22.04".to_string()),
        architecture: Some("x86_64".to_string()),
        vendor: Some("Acer".to_string()),
        model: Some("Aspire 5".to_string()),
        serial_number: Some("TESTSER1".to_string()),
        mac_addresses: vec!["08:8f:c3:1a:2b:3c".to_string()],
    }
}

/// Register a device and return its id.
pub fn registered_device(state: &AppState, fingerprint: &str) -> String {
    let (device, _) = state
        .store()
        .register_agent(&register_request(fingerprint))
        .expect("registration failed");
    device.device_id
}
