//! Local discovery endpoint.
//!
//! A minimal HTTP responder on the loopback interface so a browser on the
//! same physical machine can discover this device's identity during account
//! linking — no copying, no pairing codes.
//!
//! Trust boundary: the listener binds `127.0.0.1` only, so nothing off-host
//! can reach it, and that is the entire access control. Adding
//! authentication here would defeat the zero-friction linking flow the
//! endpoint exists for; the payload is identity material the local user
//! already owns.

use axum::{extract::State, response::Json, routing::get, Router};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use warden_types::protocol::DeviceInfoResponse;

/// Identity the endpoint serves; registration fills it in.
#[derive(Debug, Default)]
pub struct AgentIdentity {
    pub device_id: Option<String>,
    pub fingerprint_hash: Option<String>,
}

pub type SharedIdentity = Arc<RwLock<AgentIdentity>>;

async fn device_info(State(identity): State<SharedIdentity>) -> Json<DeviceInfoResponse> {
    let guard = identity.read().unwrap_or_else(std::sync::PoisonError::into_inner);
    Json(DeviceInfoResponse {
        device_id: guard.device_id.clone().unwrap_or_else(|| "not-registered".to_string()),
        fingerprint_hash: guard.fingerprint_hash.clone(),
        status: if guard.device_id.is_some() { "registered" } else { "pending" }.to_string(),
    })
}

/// Start the discovery listener as an independent task. Failure to bind is
/// logged but never fatal — the agent keeps running without local discovery.
pub fn start(identity: SharedIdentity, port: u16) {
    tokio::spawn(async move {
        // CORS is open so the dashboard page's JavaScript can read the
        // response; reachability is still loopback-only.
        let app = Router::new()
            .route("/device-info", get(device_info))
            .with_state(identity)
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(
                    "[Discovery] Local discovery endpoint on http://127.0.0.1:{}/device-info",
                    port
                );
                if let Err(e) = axum::serve(listener, app).await {
                    warn!("[Discovery] Server stopped: {}", e);
                }
            }
            Err(e) => {
                warn!("[Discovery] Could not bind 127.0.0.1:{}: {}", port, e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_device_info_before_and_after_registration() {
        let identity: SharedIdentity = Arc::new(RwLock::new(AgentIdentity::default()));

        let Json(info) = device_info(State(identity.clone())).await;
        assert_eq!(info.device_id, "not-registered");
        assert_eq!(info.status, "pending");

        {
            let mut guard = identity.write().unwrap();
            guard.device_id = Some("field-laptop-abc".to_string());
            guard.fingerprint_hash = Some("cafe".to_string());
        }

        let Json(info) = device_info(State(identity)).await;
        assert_eq!(info.device_id, "field-laptop-abc");
        assert_eq!(info.status, "registered");
        assert_eq!(info.fingerprint_hash.as_deref(), Some("cafe"));
    }
}
