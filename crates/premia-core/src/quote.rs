//! Quote request, signed quote and fill types.

use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::u256_dec;
use crate::error::{CoreError, Result};
use crate::option::{OptionDescriptor, OptionType, PoolKey};

/// Minimum quote lifetime in seconds.
pub const MIN_DEADLINE_SECS: u64 = 60;

/// Quote side from the maker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// A bid is a buy quote.
    #[inline]
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Bid)
    }

    pub fn from_is_buy(is_buy: bool) -> Self {
        if is_buy {
            Self::Bid
        } else {
            Self::Ask
        }
    }
}

/// Inbound request to publish a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub base: String,
    pub quote: String,
    pub expiration: String,
    pub strike: Decimal,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    /// Lifetime in seconds from issuance.
    pub deadline: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taker: Option<Address>,
}

impl QuoteRequest {
    pub fn descriptor(&self) -> OptionDescriptor {
        OptionDescriptor {
            base: self.base.clone(),
            quote: self.quote.clone(),
            expiration: self.expiration.clone(),
            strike: self.strike,
            option_type: self.option_type,
        }
    }

    /// Field-level checks that need no chain or calendar context.
    pub fn validate(&self, min_deadline: u64) -> Result<()> {
        if self.deadline < min_deadline {
            return Err(CoreError::Validation(format!(
                "deadline is invalid (cannot be less than {min_deadline} sec)"
            )));
        }
        if self.size <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "size is invalid (must be greater than 0)".to_string(),
            ));
        }
        if self.price <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "price is invalid (must be greater than 0)".to_string(),
            ));
        }
        if self.strike <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "strike is invalid (must be greater than 0)".to_string(),
            ));
        }
        Ok(())
    }
}

/// ECDSA signature split into its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSignature {
    pub r: B256,
    pub s: B256,
    /// Recovery id as 27 or 28.
    pub v: u8,
}

/// A quote signed by the gateway's maker key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedQuote {
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
    /// Absolute expiry of the quote (Unix seconds).
    pub deadline: u64,
    pub salt: u64,
    pub signature: SplitSignature,
    /// EIP-712 digest of the quote, also its on-chain hash.
    pub quote_id: B256,
}

/// Request to fill part of an active quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    pub quote_id: B256,
    pub trade_size: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> QuoteRequest {
        QuoteRequest {
            base: "WETH".to_string(),
            quote: "USDC".to_string(),
            expiration: "27MAR26".to_string(),
            strike: dec!(1500),
            option_type: OptionType::Call,
            side: Side::Ask,
            size: dec!(1),
            price: dec!(0.1),
            deadline: 120,
            taker: None,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(request().validate(MIN_DEADLINE_SECS).is_ok());
    }

    #[test]
    fn test_validate_short_deadline() {
        let mut req = request();
        req.deadline = 20;
        let err = req.validate(MIN_DEADLINE_SECS).unwrap_err();
        assert_eq!(
            err.to_string(),
            "deadline is invalid (cannot be less than 60 sec)"
        );
    }

    #[test]
    fn test_validate_non_positive_size_and_price() {
        let mut req = request();
        req.size = dec!(0);
        assert!(matches!(
            req.validate(MIN_DEADLINE_SECS),
            Err(CoreError::Validation(_))
        ));

        let mut req = request();
        req.price = dec!(-0.1);
        assert!(matches!(
            req.validate(MIN_DEADLINE_SECS),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_quote_request_wire_format() {
        let json = r#"{
            "base": "WETH",
            "quote": "USDC",
            "expiration": "27MAR26",
            "strike": 1500,
            "type": "C",
            "side": "ask",
            "size": 1,
            "price": 0.1,
            "deadline": 120
        }"#;
        let parsed: QuoteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, request());
    }

    #[test]
    fn test_side_is_buy() {
        assert!(Side::Bid.is_buy());
        assert!(!Side::Ask.is_buy());
        assert_eq!(Side::from_is_buy(true), Side::Bid);
    }

    #[test]
    fn test_fill_request_wire_format() {
        let json = format!(r#"{{"quoteId":"{}","tradeSize":"0.5"}}"#, B256::repeat_byte(0xab));
        let parsed: FillRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.quote_id, B256::repeat_byte(0xab));
        assert_eq!(parsed.trade_size, dec!(0.5));
    }
}
