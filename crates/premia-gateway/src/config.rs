//! Gateway configuration.
//!
//! Loaded from a TOML file with `PREMIA__SECTION__KEY` environment
//! overrides layered on top.

use std::net::SocketAddr;
use std::path::PathBuf;

use alloy::primitives::Address;
use premia_executor::{KeySource, OrchestratorConfig, RetryPolicy};
use premia_orderbook::OrderbookConfig;
use premia_registry::ChainConfig;
use premia_ws::{HubConfig, RelayConfig};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub chain: ChainConfig,
    #[serde(default)]
    pub orderbook: OrderbookConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub relay: RelaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid bind address: {e}")))
    }
}

/// Where the maker key comes from. A key file takes precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    #[serde(default = "default_key_env")]
    pub key_env: String,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// Refuse to start if the loaded key does not match.
    #[serde(default)]
    pub expected_address: Option<Address>,
}

fn default_key_env() -> String {
    "PREMIA_PRIVATE_KEY".to_string()
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
            key_file: None,
            expected_address: None,
        }
    }
}

impl SignerConfig {
    pub fn key_source(&self) -> KeySource {
        match &self.key_file {
            Some(path) => KeySource::File { path: path.clone() },
            None => KeySource::EnvVar {
                var_name: self.key_env.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Items per fill, cancel or order lookup batch. Default: 25.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Minimum quote lifetime (seconds). Default: 60.
    #[serde(default = "default_min_deadline_secs")]
    pub min_deadline_secs: u64,
    /// Confirmations awaited after each write. Default: 1.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

fn default_max_batch_size() -> usize {
    premia_core::MAX_BATCH_SIZE
}

fn default_min_deadline_secs() -> u64 {
    premia_core::MIN_DEADLINE_SECS
}

fn default_confirmations() -> u64 {
    1
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            min_deadline_secs: default_min_deadline_secs(),
            confirmations: default_confirmations(),
        }
    }
}

/// Upstream event relay. URL and key come from the orderbook section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    #[serde(default = "default_relay_enabled")]
    pub enabled: bool,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

fn default_relay_enabled() -> bool {
    true
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_idle_timeout_ms() -> u64 {
    90_000
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            enabled: default_relay_enabled(),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load a TOML file, then apply `PREMIA__*` environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix("PREMIA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without environment overrides.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.chain.tokens.is_empty() {
            return Err(AppError::Config("chain.tokens must not be empty".to_string()));
        }
        if self.limits.max_batch_size == 0 {
            return Err(AppError::Config(
                "limits.max_batch_size must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            chain_id: self.chain.chain_id,
            max_batch_size: self.limits.max_batch_size,
            min_deadline_secs: self.limits.min_deadline_secs,
            confirmations: self.limits.confirmations,
            erc20_router: self.chain.erc20_router,
            retry: self.retry,
        }
    }

    pub fn relay(&self) -> RelayConfig {
        RelayConfig {
            url: self.orderbook.ws_url.clone(),
            api_key: self.orderbook.api_key.clone(),
            chain_id: self.chain.chain_id,
            max_reconnect_attempts: self.relay.max_reconnect_attempts,
            reconnect_base_delay_ms: self.relay.reconnect_base_delay_ms,
            reconnect_max_delay_ms: self.relay.reconnect_max_delay_ms,
            idle_timeout_ms: self.relay.idle_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[chain]
chain_id = 42161
rpc_url = "http://localhost:8545"
pool_factory = "0x0000000000000000000000000000000000000001"
oracle_adapter = "0x0000000000000000000000000000000000000002"
erc20_router = "0x0000000000000000000000000000000000000003"

[[chain.tokens]]
symbol = "WETH"
address = "0x0000000000000000000000000000000000000011"
decimals = 18
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.limits.max_batch_size, 25);
        assert_eq!(config.limits.min_deadline_secs, 60);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.hub.max_connections, 1_000);
        assert!(config.relay.enabled);
        assert_eq!(config.signer.key_env, "PREMIA_PRIVATE_KEY");
        assert_eq!(config.chain.confirmation_timeout_ms, 120_000);
    }

    #[test]
    fn test_key_file_takes_precedence() {
        let mut signer = SignerConfig::default();
        assert!(matches!(signer.key_source(), KeySource::EnvVar { .. }));
        signer.key_file = Some(PathBuf::from("/run/secrets/maker"));
        assert!(matches!(signer.key_source(), KeySource::File { .. }));
    }

    #[test]
    fn test_empty_token_table_rejected() {
        let content = MINIMAL.split("[[chain.tokens]]").next().unwrap();
        assert!(matches!(
            AppConfig::from_toml_str(content),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_orchestrator_config_mapping() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.limits.max_batch_size = 10;
        let orchestrator = config.orchestrator();
        assert_eq!(orchestrator.chain_id, 42161);
        assert_eq!(orchestrator.max_batch_size, 10);
        assert_eq!(
            orchestrator.erc20_router,
            "0x0000000000000000000000000000000000000003"
                .parse::<Address>()
                .unwrap()
        );

        let relay = config.relay();
        assert_eq!(relay.url, config.orderbook.ws_url);
        assert_eq!(relay.chain_id, 42161);
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        };
        assert_eq!(server.socket_addr().unwrap().port(), 8080);
        let bad = ServerConfig {
            bind_addr: "not an ip".to_string(),
            port: 1,
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_load_shipped_default() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let config = AppConfig::load(path).unwrap();
        assert_eq!(config.chain.chain_id, 42161);
        assert!(config.chain.tokens.len() >= 2);
    }
}
