//! Subscription hub.
//!
//! Tracks every open client connection: whether it has authenticated and
//! which filter it holds per channel. Events published to the hub are fanned
//! out to each connection whose filter on the event's channel matches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use premia_orderbook::OrderbookApi;
use premia_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::filter::EventAttributes;
use crate::message::{Channel, ClientMessage, FilterBody, ServerMessage};

pub type ConnectionId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Maximum concurrent client connections. Default: 1,000.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Per-connection outbound queue. Events beyond it are dropped. Default: 256.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

fn default_max_connections() -> usize {
    1_000
}

fn default_outbound_buffer() -> usize {
    256
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

#[derive(Debug)]
struct Connection {
    sender: mpsc::Sender<ServerMessage>,
    authenticated: bool,
    filters: HashMap<Channel, FilterBody>,
}

pub struct SubscriptionHub {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    auth: Arc<dyn OrderbookApi>,
    config: HubConfig,
}

impl SubscriptionHub {
    pub fn new(auth: Arc<dyn OrderbookApi>, config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            auth,
            config,
        }
    }

    /// Register a new connection. Returns `None` once the hub is full.
    pub fn register(&self) -> Option<(ConnectionId, mpsc::Receiver<ServerMessage>)> {
        let mut connections = self.connections.write();
        if connections.len() >= self.config.max_connections {
            warn!(
                max = self.config.max_connections,
                "Subscription hub full, rejecting connection"
            );
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.config.outbound_buffer);
        connections.insert(
            id,
            Connection {
                sender,
                authenticated: false,
                filters: HashMap::new(),
            },
        );
        drop(connections);

        Metrics::ws_connection_opened();
        debug!(connection = id, "WS client registered");
        Some((id, receiver))
    }

    pub fn unregister(&self, id: ConnectionId) {
        if self.connections.write().remove(&id).is_some() {
            Metrics::ws_connection_closed();
            debug!(connection = id, "WS client unregistered");
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_authenticated(&self, id: ConnectionId) -> bool {
        self.connections
            .read()
            .get(&id)
            .map(|c| c.authenticated)
            .unwrap_or(false)
    }

    /// Handle one raw text frame and produce the reply.
    pub async fn handle_text(&self, id: ConnectionId, text: &str) -> ServerMessage {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle_message(id, msg).await,
            Err(e) => ServerMessage::error(format!("Invalid message: {e}")),
        }
    }

    pub async fn handle_message(&self, id: ConnectionId, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::Auth { api_key } => self.authenticate(id, &api_key).await,
            ClientMessage::Filter { channel, body } => {
                let mut connections = self.connections.write();
                let Some(conn) = connections.get_mut(&id) else {
                    return ServerMessage::error("Unknown connection");
                };
                if !conn.authenticated {
                    return ServerMessage::error("Not authenticated");
                }
                conn.filters.insert(channel, body);
                debug!(connection = id, %channel, "Filter installed");
                ServerMessage::info(format!("Subscribed to {channel}"))
            }
            ClientMessage::Unsubscribe { channel } => {
                let mut connections = self.connections.write();
                let Some(conn) = connections.get_mut(&id) else {
                    return ServerMessage::error("Unknown connection");
                };
                if !conn.authenticated {
                    return ServerMessage::error("Not authenticated");
                }
                conn.filters.remove(&channel);
                debug!(connection = id, %channel, "Filter removed");
                ServerMessage::info(format!("Unsubscribed from {channel}"))
            }
        }
    }

    async fn authenticate(&self, id: ConnectionId, api_key: &str) -> ServerMessage {
        let valid = match self.auth.validate_api_key(api_key).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(connection = id, error = %e, "API key check failed");
                Metrics::upstream_error("auth");
                return ServerMessage::error("Authentication unavailable");
            }
        };
        if !valid {
            return ServerMessage::error("Invalid API key");
        }

        match self.connections.write().get_mut(&id) {
            Some(conn) => {
                conn.authenticated = true;
                info!(connection = id, "WS client authenticated");
                ServerMessage::info("Session authenticated")
            }
            None => ServerMessage::error("Unknown connection"),
        }
    }

    /// Fan an event out to matching subscribers. Returns the delivery count.
    ///
    /// INFO and ERROR messages carry no channel and are never published.
    pub fn publish(&self, event: ServerMessage) -> usize {
        let (Some(channel), Some(body)) = (event.channel(), event.body()) else {
            return 0;
        };
        let attrs = EventAttributes::from_body(body);
        Metrics::ws_event(event.kind());

        let connections = self.connections.read();
        let mut delivered = 0;
        for (id, conn) in connections.iter() {
            if !conn.authenticated {
                continue;
            }
            let Some(filter) = conn.filters.get(&channel) else {
                continue;
            };
            if !filter.matches(&attrs) {
                continue;
            }
            match conn.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(connection = id, kind = event.kind(), "Outbound queue full, event dropped");
                }
                // Socket task is gone; unregister follows.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }
}
