//! Quote and RFQ event streaming.
//!
//! - `SubscriptionHub`: per-connection auth state and channel filters
//! - `ws_router` / `serve_socket`: axum socket bridge into the hub
//! - `UpstreamRelay`: reconnecting client of the orderbook event stream

pub mod error;
pub mod filter;
pub mod hub;
pub mod message;
pub mod server;
pub mod upstream;

pub use error::{WsError, WsResult};
pub use filter::EventAttributes;
pub use hub::{ConnectionId, HubConfig, SubscriptionHub};
pub use message::{Channel, ClientMessage, FilterBody, ServerMessage};
pub use server::{serve_socket, ws_router};
pub use upstream::{RelayConfig, RelayState, UpstreamRelay};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any outbound TLS connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
