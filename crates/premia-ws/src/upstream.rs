//! Upstream relay.
//!
//! Holds one WebSocket connection to the orderbook event stream, subscribes
//! to both channels for the configured chain, and publishes every event it
//! receives into the hub. Reconnects with exponential backoff until shut down.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use premia_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{WsError, WsResult};
use crate::hub::SubscriptionHub;
use crate::message::{Channel, ClientMessage, FilterBody, ServerMessage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Orderbook stream URL.
    pub url: String,
    /// Key sent in the AUTH frame.
    #[serde(default)]
    pub api_key: String,
    pub chain_id: u64,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Reconnect when nothing arrives for this long. Default: 90,000.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
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

impl RelayConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, chain_id: u64) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            chain_id,
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

pub struct UpstreamRelay {
    config: RelayConfig,
    hub: Arc<SubscriptionHub>,
    state: Arc<RwLock<RelayState>>,
    shutdown_token: CancellationToken,
}

impl UpstreamRelay {
    pub fn new(config: RelayConfig, hub: Arc<SubscriptionHub>) -> Self {
        Self {
            config,
            hub,
            state: Arc::new(RwLock::new(RelayState::Disconnected)),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> RelayState {
        *self.state.read()
    }

    /// Stop the relay. The run loop exits at its next await point.
    pub fn shutdown(&self) {
        info!("Upstream relay shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and relay until shutdown or the reconnect budget runs out.
    pub async fn run(&self) -> WsResult<()> {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                *self.state.write() = RelayState::Disconnected;
                return Ok(());
            }

            *self.state.write() = RelayState::Connecting;

            match self.try_connect().await {
                Ok(connected) => {
                    info!("Orderbook stream closed");
                    if connected {
                        attempt = 0;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Orderbook stream error");
                    Metrics::upstream_error("orderbook_ws");
                }
            }

            if self.is_shutdown() {
                *self.state.write() = RelayState::Disconnected;
                return Ok(());
            }

            attempt += 1;
            if self.config.max_reconnect_attempts > 0 && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                *self.state.write() = RelayState::Disconnected;
                return Err(WsError::ReconnectExhausted { attempts: attempt });
            }

            *self.state.write() = RelayState::Reconnecting;
            let delay = self.backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting to orderbook stream");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    *self.state.write() = RelayState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    /// One connection lifetime. `Ok(true)` once the handshake went through.
    async fn try_connect(&self) -> WsResult<bool> {
        debug!(url = %self.config.url, "Connecting to orderbook stream");
        let (stream, _) = connect_async(self.config.url.as_str()).await?;
        let (mut write, mut read) = stream.split();

        for msg in self.handshake() {
            write.send(Message::Text(serde_json::to_string(&msg)?)).await?;
        }
        *self.state.write() = RelayState::Connected;
        info!(chain_id = self.config.chain_id, "Orderbook stream connected");

        let idle = Duration::from_millis(self.config.idle_timeout_ms);
        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(true);
                }
                frame = tokio::time::timeout(idle, read.next()) => {
                    let frame = frame.map_err(|_| WsError::IdleTimeout {
                        idle_ms: self.config.idle_timeout_ms,
                    })?;
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text),
                        Some(Ok(Message::Ping(data))) => write.send(Message::Pong(data)).await?,
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1005, String::new()));
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(true),
                    }
                }
            }
        }
    }

    fn handshake(&self) -> [ClientMessage; 3] {
        [
            ClientMessage::Auth {
                api_key: self.config.api_key.clone(),
            },
            ClientMessage::Filter {
                channel: Channel::Quotes,
                body: FilterBody::chain(self.config.chain_id),
            },
            ClientMessage::Filter {
                channel: Channel::Rfq,
                body: FilterBody::chain(self.config.chain_id),
            },
        ]
    }

    fn handle_text(&self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(ServerMessage::Info { message }) => debug!(%message, "Orderbook stream info"),
            Ok(ServerMessage::Error { message }) => {
                warn!(%message, "Orderbook stream reported an error");
            }
            Ok(event) => {
                let delivered = self.hub.publish(event);
                debug!(delivered, "Relayed orderbook event");
            }
            Err(e) => warn!(error = %e, "Unparseable orderbook stream frame"),
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // base * 2^(attempt-1), capped
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent).min(max);

        Duration::from_millis(delay + jitter_ms(base))
    }
}

/// Jitter in `[0, min(base, 1000))` ms.
fn jitter_ms(base: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let span = base.clamp(1, 1_000);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % span
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubConfig;
    use premia_orderbook::MockOrderbook;

    fn relay(config: RelayConfig) -> UpstreamRelay {
        let hub = SubscriptionHub::new(Arc::new(MockOrderbook::new()), HubConfig::default());
        UpstreamRelay::new(config, Arc::new(hub))
    }

    #[test]
    fn test_config_defaults() {
        let config: RelayConfig =
            serde_json::from_str(r#"{"url":"ws://localhost:3000","chain_id":42161}"#).unwrap();
        assert_eq!(config.max_reconnect_attempts, 0);
        assert_eq!(config.reconnect_base_delay_ms, 1_000);
        assert_eq!(config.reconnect_max_delay_ms, 60_000);
        assert_eq!(config.idle_timeout_ms, 90_000);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let relay = relay(RelayConfig::new("ws://localhost:1", "", 1));
        let first = relay.backoff_delay(1).as_millis() as u64;
        let third = relay.backoff_delay(3).as_millis() as u64;
        let late = relay.backoff_delay(30).as_millis() as u64;

        assert!((1_000..2_000).contains(&first));
        assert!((4_000..5_000).contains(&third));
        assert!((60_000..61_000).contains(&late));
    }

    #[test]
    fn test_handshake_subscribes_both_channels() {
        let relay = relay(RelayConfig::new("ws://localhost:1", "key", 42161));
        let [auth, quotes, rfq] = relay.handshake();
        assert_eq!(
            auth,
            ClientMessage::Auth {
                api_key: "key".to_string()
            }
        );
        assert_eq!(
            quotes,
            ClientMessage::Filter {
                channel: Channel::Quotes,
                body: FilterBody::chain(42161)
            }
        );
        assert!(matches!(rfq, ClientMessage::Filter { channel: Channel::Rfq, .. }));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut config = RelayConfig::new("ws://127.0.0.1:1", "", 1);
        config.max_reconnect_attempts = 2;
        config.reconnect_base_delay_ms = 1;
        config.reconnect_max_delay_ms = 1;
        let relay = relay(config);

        let result = relay.run().await;
        assert!(matches!(
            result,
            Err(WsError::ReconnectExhausted { attempts: 2 })
        ));
        assert_eq!(relay.state(), RelayState::Disconnected);
    }

    #[tokio::test]
    async fn test_shutdown_before_run() {
        let relay = relay(RelayConfig::new("ws://127.0.0.1:1", "", 1));
        relay.shutdown();
        tokio_test::assert_ok!(relay.run().await);
        assert_eq!(relay.state(), RelayState::Disconnected);
    }
}
