//! Proxy to the external Premia orderbook.
//!
//! - `OrderbookApi`: the operations the gateway relies on
//! - `OrderbookClient`: REST implementation with `x-apikey` auth
//! - `normalize`: conversion of stored quotes into client-facing decimals

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

pub use api::{MockOrderbook, OrderbookApi};
pub use client::{OrderbookClient, API_KEY_HEADER};
pub use config::OrderbookConfig;
pub use error::{OrderbookError, OrderbookResult};
pub use normalize::{
    normalize_post_response, normalize_quote, normalize_quotes, NormalizedPostResponse,
    NormalizedQuote,
};
pub use types::{OrderQuery, OrderbookQuote, PostQuotesResponse, QuoteQuery, RejectedQuote};
