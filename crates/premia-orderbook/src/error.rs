//! Orderbook proxy error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderbookError {
    /// Non-success status from the orderbook, passed through to clients.
    #[error("Orderbook returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Orderbook request failed: {0}")]
    Transport(String),

    #[error("Failed to decode orderbook response: {0}")]
    Decode(String),

    #[error("Failed to normalize quote: {0}")]
    Normalize(String),
}

pub type OrderbookResult<T> = Result<T, OrderbookError>;
