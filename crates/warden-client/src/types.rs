use serde::{Deserialize, Serialize};

/// Retry behavior for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay_ms: 500, max_delay_ms: 8_000 }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server base URL, e.g. `http://127.0.0.1:8070`
    pub base_url: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: 15,
            retry: RetryPolicy::default(),
        }
    }
}

fn default_base_url() -> String {
    std::env::var("WARDEN_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:8070".to_string())
}
