//! Orderbook wire types.

use alloy::primitives::{Address, B256, U256};
use premia_core::decimal::u256_dec;
use premia_core::{PoolKey, Side, SignedQuote, SplitSignature};
use serde::{Deserialize, Serialize};

/// A quote as stored by the orderbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookQuote {
    pub pool_key: PoolKey,
    pub pool_address: Address,
    pub chain_id: u64,
    pub provider: Address,
    pub taker: Address,
    #[serde(with = "u256_dec")]
    pub price: U256,
    #[serde(with = "u256_dec")]
    pub size: U256,
    pub is_buy: bool,
    pub deadline: u64,
    pub salt: u64,
    pub signature: SplitSignature,
    pub quote_id: B256,
    /// Remaining size that can still be filled.
    #[serde(with = "u256_dec")]
    pub fillable_size: U256,
    /// Time the orderbook accepted the quote (Unix seconds).
    #[serde(default)]
    pub ts: u64,
}

impl OrderbookQuote {
    /// Record for a freshly signed quote, fully fillable.
    pub fn from_signed(quote: &SignedQuote, ts: u64) -> Self {
        Self {
            pool_key: quote.pool_key.clone(),
            pool_address: quote.pool_address,
            chain_id: quote.chain_id,
            provider: quote.provider,
            taker: quote.taker,
            price: quote.price,
            size: quote.size,
            is_buy: quote.is_buy,
            deadline: quote.deadline,
            salt: quote.salt,
            signature: quote.signature,
            quote_id: quote.quote_id,
            fillable_size: quote.size,
            ts,
        }
    }
}

/// A quote the orderbook refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedQuote {
    pub reason: String,
    pub quote: SignedQuote,
}

/// Response of `POST /quotes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostQuotesResponse {
    #[serde(default)]
    pub created: Vec<OrderbookQuote>,
    #[serde(default)]
    pub failed: Vec<RejectedQuote>,
    #[serde(default)]
    pub exists: Vec<OrderbookQuote>,
}

/// Best-quotes query for one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteQuery {
    pub pool_address: Address,
    pub chain_id: u64,
    /// Requested size, 18-decimal fixed point.
    pub size: U256,
    pub side: Side,
    pub provider: Option<Address>,
    pub taker: Option<Address>,
}

impl QuoteQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("poolAddress", self.pool_address.to_string()),
            ("size", self.size.to_string()),
            (
                "side",
                match self.side {
                    Side::Bid => "bid".to_string(),
                    Side::Ask => "ask".to_string(),
                },
            ),
            ("chainId", self.chain_id.to_string()),
        ];
        if let Some(provider) = self.provider {
            params.push(("provider", provider.to_string()));
        }
        if let Some(taker) = self.taker {
            params.push(("taker", taker.to_string()));
        }
        params
    }
}

/// Order lookup by quote ids or by provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderQuery {
    ByIds { chain_id: u64, quote_ids: Vec<B256> },
    ByProvider { chain_id: u64, provider: Address },
}

impl OrderQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::ByIds {
                chain_id,
                quote_ids,
            } => vec![
                (
                    "quoteIds",
                    quote_ids
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                ("chainId", chain_id.to_string()),
            ],
            Self::ByProvider { chain_id, provider } => vec![
                ("provider", provider.to_string()),
                ("chainId", chain_id.to_string()),
            ],
        }
    }
}
