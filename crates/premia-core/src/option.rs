//! Option series and pool identifiers.

use std::fmt;

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::u256_dec;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "C", alias = "CALL", alias = "c")]
    Call,
    #[serde(rename = "P", alias = "PUT", alias = "p")]
    Put,
}

impl OptionType {
    #[inline]
    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call)
    }

    pub fn from_is_call(is_call: bool) -> Self {
        if is_call {
            Self::Call
        } else {
            Self::Put
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// Human identification of an option series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionDescriptor {
    /// Base token symbol (e.g. "WETH").
    pub base: String,
    /// Quote token symbol (e.g. "USDC").
    pub quote: String,
    /// Maturity label in `DDMMMYY` format.
    pub expiration: String,
    pub strike: Decimal,
    #[serde(rename = "type")]
    pub option_type: OptionType,
}

impl OptionDescriptor {
    #[inline]
    pub fn is_call(&self) -> bool {
        self.option_type.is_call()
    }

    /// Symbol of the token posted as collateral: base for calls, quote for puts.
    pub fn collateral_symbol(&self) -> &str {
        if self.is_call() {
            &self.base
        } else {
            &self.quote
        }
    }
}

impl fmt::Display for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.base, self.quote, self.expiration, self.strike, self.option_type
        )
    }
}

/// Canonical on-chain pool identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolKey {
    pub base: Address,
    pub quote: Address,
    pub oracle_adapter: Address,
    /// Strike in 18-decimal fixed point.
    #[serde(with = "u256_dec")]
    pub strike: U256,
    /// Expiry as Unix timestamp (08:00 UTC).
    pub maturity: u64,
    pub is_call_pool: bool,
}

/// Pool contract address as reported by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAddress {
    pub address: Address,
    pub deployed: bool,
}

/// ERC-1155 position token ids held in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Short,
    Long,
}

impl TokenType {
    /// ERC-1155 token id.
    pub fn id(&self) -> U256 {
        match self {
            Self::Short => U256::ZERO,
            Self::Long => U256::from(1u8),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "SHORT"),
            Self::Long => write!(f, "LONG"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn descriptor(option_type: OptionType) -> OptionDescriptor {
        OptionDescriptor {
            base: "WETH".to_string(),
            quote: "USDC".to_string(),
            expiration: "27MAR26".to_string(),
            strike: dec!(1500),
            option_type,
        }
    }

    #[test]
    fn test_descriptor_deserialize() {
        let json = r#"{"base":"WETH","quote":"USDC","expiration":"27MAR26","strike":"1500","type":"P"}"#;
        let parsed: OptionDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, descriptor(OptionType::Put));
    }

    #[test]
    fn test_option_type_aliases() {
        let call: OptionType = serde_json::from_str(r#""CALL""#).unwrap();
        assert_eq!(call, OptionType::Call);
        assert_eq!(serde_json::to_string(&OptionType::Put).unwrap(), r#""P""#);
    }

    #[test]
    fn test_collateral_symbol() {
        assert_eq!(descriptor(OptionType::Call).collateral_symbol(), "WETH");
        assert_eq!(descriptor(OptionType::Put).collateral_symbol(), "USDC");
    }

    #[test]
    fn test_pool_key_serializes_strike_as_decimal_string() {
        let key = PoolKey {
            base: Address::ZERO,
            quote: Address::ZERO,
            oracle_adapter: Address::ZERO,
            strike: U256::from(1_500_000_000_000_000_000_000u128),
            maturity: 1_774_598_400,
            is_call_pool: true,
        };
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["strike"], "1500000000000000000000");
        assert_eq!(json["isCallPool"], true);
        assert_eq!(json["oracleAdapter"], format!("{}", Address::ZERO));
    }

    #[test]
    fn test_token_type_ids() {
        assert_eq!(TokenType::Short.id(), U256::ZERO);
        assert_eq!(TokenType::Long.id(), U256::from(1u8));
    }
}
