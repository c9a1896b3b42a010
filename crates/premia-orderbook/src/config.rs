//! Orderbook connection configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookConfig {
    /// REST base URL (e.g. "https://orderbook.premia.finance").
    pub rest_url: String,
    /// Event stream URL.
    pub ws_url: String,
    /// Key presented to the orderbook in `x-apikey`.
    #[serde(default)]
    pub api_key: String,
    /// Key verification path on the REST host.
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
    /// Request timeout (ms). Default: 10,000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_auth_path() -> String {
    "/auth/validate".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for OrderbookConfig {
    fn default() -> Self {
        Self {
            rest_url: "http://localhost:3000".to_string(),
            ws_url: "ws://localhost:3000".to_string(),
            api_key: String::new(),
            auth_path: default_auth_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
