use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use warden_types::protocol::{
    ActionResultReport, ApprovedFolderSync, ApprovedFolderSyncResponse, BrowseResultReport,
    DeviceSnapshot, MessageAckRequest, PendingBrowseResponse, PendingWipeResponse,
    RegisterRequest, RegisterResponse, ReportResponse, StatusReport, WipeProgressReport,
};

use crate::error::ClientError;
use crate::types::ClientConfig;

/// HTTP client for the Warden server, used by the endpoint agent.
#[derive(Clone)]
pub struct WardenClient {
    client: Client,
    config: ClientConfig,
}

impl WardenClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Agent endpoints
    // ------------------------------------------------------------------

    /// Agent-first registration. Idempotent server-side, retried here on
    /// transient failures.
    pub async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ClientError> {
        self.post_with_retry("/api/agent/register", req).await
    }

    /// One poll tick: fetch the canonical snapshot. No retry — the next tick
    /// is the retry.
    pub async fn fetch_snapshot(&self, device_id: &str) -> Result<DeviceSnapshot, ClientError> {
        self.get_once(&format!("/api/agent/device/{}", device_id)).await
    }

    /// Periodic status report.
    pub async fn report(&self, report: &StatusReport) -> Result<ReportResponse, ClientError> {
        self.post_once("/api/agent/report", report).await
    }

    /// Acknowledge (clear) the one-shot owner message.
    pub async fn ack_message(&self, device_id: &str) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .post_once(
                "/api/agent/message_ack",
                &MessageAckRequest { device_id: device_id.to_string() },
            )
            .await?;
        Ok(())
    }

    /// Report the outcome of a locally executed action.
    pub async fn report_action_result(
        &self,
        report: &ActionResultReport,
    ) -> Result<(), ClientError> {
        let _: serde_json::Value = self.post_once("/api/agent/action_result", report).await?;
        Ok(())
    }

    /// Replace the server's copy of the approved-folder set.
    pub async fn sync_approved_folders(
        &self,
        device_id: &str,
        folders: &[String],
    ) -> Result<ApprovedFolderSyncResponse, ClientError> {
        self.post_with_retry(
            &format!("/api/v1/approved_folders/{}", device_id),
            &ApprovedFolderSync { folders: folders.to_vec() },
        )
        .await
    }

    // ------------------------------------------------------------------
    // Wipe / browse sub-protocol
    // ------------------------------------------------------------------

    pub async fn pending_wipe(&self, device_id: &str) -> Result<PendingWipeResponse, ClientError> {
        self.get_once(&format!("/api/v1/wipe/pending/{}", device_id)).await
    }

    /// Progress reports are retried: losing a terminal report would leave
    /// the operation stuck non-terminal on the server.
    pub async fn report_wipe_progress(
        &self,
        report: &WipeProgressReport,
    ) -> Result<(), ClientError> {
        let _: serde_json::Value =
            self.post_with_retry("/api/v1/wipe/update_status", report).await?;
        Ok(())
    }

    pub async fn pending_browse(
        &self,
        device_id: &str,
    ) -> Result<PendingBrowseResponse, ClientError> {
        self.get_once(&format!("/api/v1/wipe/browse_request/{}", device_id)).await
    }

    pub async fn submit_browse_result(
        &self,
        report: &BrowseResultReport,
    ) -> Result<(), ClientError> {
        let _: serde_json::Value = self.post_once("/api/v1/wipe/browse_result", report).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transport helpers
    // ------------------------------------------------------------------

    async fn get_once<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .client
            .get(format!("{}{}", self.config.base_url, path))
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Self::decode(resp).await
    }

    async fn post_once<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self
            .client
            .post(format!("{}{}", self.config.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Self::decode(resp).await
    }

    /// POST with bounded exponential backoff on transient failures.
    async fn post_with_retry<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut attempts = 0;
        let mut delay = self.config.retry.base_delay_ms;

        loop {
            attempts += 1;
            match self.post_once(path, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    if attempts > self.config.retry.max_retries {
                        tracing::warn!("{} failed after {} attempts: {}", path, attempts, e);
                        return Err(ClientError::RetriesExhausted(attempts));
                    }
                    tracing::debug!("{} transient failure, retrying: {}", path, e);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(self.config.retry.max_delay_ms);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();

        if status.is_success() {
            return resp
                .json()
                .await
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }

        let message = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound { message }),
            StatusCode::CONFLICT => Err(ClientError::Conflict { message }),
            StatusCode::BAD_REQUEST => Err(ClientError::BadRequest { message }),
            s if s.is_server_error() => {
                Err(ClientError::ServerError { status: s.as_u16(), message })
            }
            s => Err(ClientError::InvalidResponse(format!("unexpected status {}: {}", s, message))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetryPolicy;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String) -> WardenClient {
        WardenClient::new(ClientConfig {
            base_url,
            timeout_secs: 5,
            retry: RetryPolicy { max_retries: 2, base_delay_ms: 10, max_delay_ms: 50 },
        })
        .unwrap()
    }

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            fingerprint_hash: "ab".repeat(32),
            agent_version: "0.1.0".to_string(),
            hostname: Some("host".to_string()),
            os_name: None,
            os_version: None,
            architecture: None,
            vendor: None,
            model: None,
            serial_number: None,
            mac_addresses: vec![],
        }
    }

    #[tokio::test]
    async fn test_register_decodes_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/agent/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "device_id": "host-abc",
                "user_linked": false,
                "message": "registered"
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let resp = client.register(&register_request()).await.unwrap();
        assert_eq!(resp.device_id, "host-abc");
        assert!(!resp.user_linked);
    }

    #[tokio::test]
    async fn test_register_retries_on_server_error() {
        let server = MockServer::start().await;
        // Two failures, then success
        Mock::given(method("POST"))
            .and(path("/api/agent/register"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/agent/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "device_id": "host-abc",
                "user_linked": true,
                "message": "already registered"
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let resp = client.register(&register_request()).await.unwrap();
        assert!(resp.user_linked);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/wipe/update_status"))
            .respond_with(ResponseTemplate::new(409).set_body_string("wipe already active"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let report = WipeProgressReport {
            device_id: "d".to_string(),
            operation_id: 1,
            status: warden_types::WipeStatus::InProgress,
            files_deleted: 0,
            total_files: 0,
            error_message: None,
        };
        let err = client.report_wipe_progress(&report).await.unwrap_err();
        assert!(matches!(err, ClientError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_poll_maps_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/agent/device/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Device not found"))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client.fetch_snapshot("ghost").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }
}
