//! Relay and socket errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Gave up on orderbook stream after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Orderbook stream closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("No orderbook stream traffic for {idle_ms}ms")]
    IdleTimeout { idle_ms: u64 },

    #[error("Transport error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Frame encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WsResult<T> = Result<T, WsError>;
