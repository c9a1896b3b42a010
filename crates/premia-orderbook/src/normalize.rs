//! Conversion of orderbook records into client-facing quotes.
//!
//! Fixed-point amounts become decimals, token addresses become symbols and
//! the maturity becomes its `DDMMMYY` label.

use alloy::primitives::{Address, B256};
use premia_core::maturity::label_from_timestamp;
use premia_core::{from_wad, FailedItem, OptionType, Side};
use premia_registry::TokenTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{OrderbookError, OrderbookResult};
use crate::types::{OrderbookQuote, PostQuotesResponse};

/// A quote as returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuote {
    pub base: String,
    pub quote: String,
    pub expiration: String,
    pub strike: Decimal,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub remaining_size: Decimal,
    pub provider: Address,
    pub taker: Address,
    pub deadline: u64,
    pub quote_id: B256,
    pub pool_address: Address,
    pub chain_id: u64,
    pub ts: u64,
}

/// Normalized `POST /quotes` outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPostResponse {
    pub created: Vec<NormalizedQuote>,
    pub failed: Vec<FailedItem<NormalizedQuote>>,
    pub exists: Vec<NormalizedQuote>,
}

fn symbol(tokens: &TokenTable, address: &Address) -> OrderbookResult<String> {
    tokens
        .symbol_of(address)
        .map(str::to_string)
        .ok_or_else(|| OrderbookError::Normalize(format!("unknown token {address}")))
}

fn decimal(value: alloy::primitives::U256) -> OrderbookResult<Decimal> {
    from_wad(value).map_err(|e| OrderbookError::Normalize(e.to_string()))
}

/// Normalize one orderbook record.
pub fn normalize_quote(
    quote: &OrderbookQuote,
    tokens: &TokenTable,
) -> OrderbookResult<NormalizedQuote> {
    let key = &quote.pool_key;
    let expiration = label_from_timestamp(key.maturity).ok_or_else(|| {
        OrderbookError::Normalize(format!("invalid maturity {}", key.maturity))
    })?;

    Ok(NormalizedQuote {
        base: symbol(tokens, &key.base)?,
        quote: symbol(tokens, &key.quote)?,
        expiration,
        strike: decimal(key.strike)?,
        option_type: OptionType::from_is_call(key.is_call_pool),
        side: Side::from_is_buy(quote.is_buy),
        price: decimal(quote.price)?,
        size: decimal(quote.size)?,
        remaining_size: decimal(quote.fillable_size)?,
        provider: quote.provider,
        taker: quote.taker,
        deadline: quote.deadline,
        quote_id: quote.quote_id,
        pool_address: quote.pool_address,
        chain_id: quote.chain_id,
        ts: quote.ts,
    })
}

/// Normalize a list of records.
pub fn normalize_quotes(
    quotes: &[OrderbookQuote],
    tokens: &TokenTable,
) -> OrderbookResult<Vec<NormalizedQuote>> {
    quotes.iter().map(|q| normalize_quote(q, tokens)).collect()
}

/// Normalize the three buckets of a post response.
pub fn normalize_post_response(
    response: &PostQuotesResponse,
    tokens: &TokenTable,
) -> OrderbookResult<NormalizedPostResponse> {
    let failed = response
        .failed
        .iter()
        .map(|rejected| {
            let record = OrderbookQuote::from_signed(&rejected.quote, 0);
            normalize_quote(&record, tokens).map(|q| FailedItem::new(q, rejected.reason.clone()))
        })
        .collect::<OrderbookResult<Vec<_>>>()?;

    Ok(NormalizedPostResponse {
        created: normalize_quotes(&response.created, tokens)?,
        failed,
        exists: normalize_quotes(&response.exists, tokens)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use premia_core::{to_wad, PoolKey, SplitSignature};
    use premia_registry::TokenConfig;
    use rust_decimal_macros::dec;

    fn tokens() -> TokenTable {
        TokenTable::new(&[
            TokenConfig {
                symbol: "WETH".to_string(),
                address: Address::repeat_byte(0x11),
                decimals: 18,
            },
            TokenConfig {
                symbol: "USDC".to_string(),
                address: Address::repeat_byte(0x22),
                decimals: 6,
            },
        ])
        .unwrap()
    }

    fn record() -> OrderbookQuote {
        OrderbookQuote {
            pool_key: PoolKey {
                base: Address::repeat_byte(0x11),
                quote: Address::repeat_byte(0x22),
                oracle_adapter: Address::repeat_byte(0x0a),
                strike: to_wad(dec!(1500)).unwrap(),
                // 2026-03-27 08:00 UTC
                maturity: 1_774_598_400,
                is_call_pool: false,
            },
            pool_address: Address::repeat_byte(0x44),
            chain_id: 42161,
            provider: Address::repeat_byte(0x55),
            taker: Address::ZERO,
            price: to_wad(dec!(0.05)).unwrap(),
            size: to_wad(dec!(2)).unwrap(),
            is_buy: true,
            deadline: 1_774_000_000,
            salt: 1,
            signature: SplitSignature {
                r: B256::repeat_byte(1),
                s: B256::repeat_byte(2),
                v: 28,
            },
            quote_id: B256::repeat_byte(9),
            fillable_size: to_wad(dec!(1.5)).unwrap(),
            ts: 1_773_000_000,
        }
    }

    #[test]
    fn test_normalize_quote() {
        let normalized = normalize_quote(&record(), &tokens()).unwrap();
        assert_eq!(normalized.base, "WETH");
        assert_eq!(normalized.quote, "USDC");
        assert_eq!(normalized.expiration, "27MAR26");
        assert_eq!(normalized.strike, dec!(1500));
        assert_eq!(normalized.option_type, OptionType::Put);
        assert_eq!(normalized.side, Side::Bid);
        assert_eq!(normalized.price, dec!(0.05));
        assert_eq!(normalized.size, dec!(2));
        assert_eq!(normalized.remaining_size, dec!(1.5));
    }

    #[test]
    fn test_normalize_unknown_token() {
        let mut quote = record();
        quote.pool_key.base = Address::repeat_byte(0x99);
        assert!(matches!(
            normalize_quote(&quote, &tokens()),
            Err(OrderbookError::Normalize(_))
        ));
    }

    #[test]
    fn test_normalized_json_shape() {
        let normalized = normalize_quote(&record(), &tokens()).unwrap();
        let json = serde_json::to_value(&normalized).unwrap();
        assert_eq!(json["type"], "P");
        assert_eq!(json["side"], "bid");
        assert_eq!(json["strike"], "1500");
        assert!(json.get("quoteId").is_some());
        assert!(json.get("remainingSize").is_some());
    }

    #[test]
    fn test_normalize_post_response_keeps_buckets() {
        let response = PostQuotesResponse {
            created: vec![record()],
            failed: vec![],
            exists: vec![record(), record()],
        };
        let normalized = normalize_post_response(&response, &tokens()).unwrap();
        assert_eq!(normalized.created.len(), 1);
        assert_eq!(normalized.exists.len(), 2);
        assert!(normalized.failed.is_empty());
    }
}
