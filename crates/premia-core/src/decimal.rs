//! Fixed-point conversion between human decimals and on-chain integers.
//!
//! Strikes, sizes and prices are 18-decimal fixed point on chain. Token
//! balances use the token's own decimals (e.g. 6 for USDC).

use alloy::primitives::U256;
use rust_decimal::Decimal;

use crate::error::{CoreError, Result};

/// Decimals of the pool's fixed-point representation.
pub const WAD_DECIMALS: u32 = 18;

/// Convert a non-negative decimal into a fixed-point integer.
///
/// # Errors
/// Fails for negative values or when `value` carries more fractional digits
/// than `decimals` can represent.
pub fn to_fixed(value: Decimal, decimals: u32) -> Result<U256> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CoreError::FixedPoint(format!("{value} is negative")));
    }
    let normalized = value.normalize();
    let scale = normalized.scale();
    if scale > decimals {
        return Err(CoreError::FixedPoint(format!(
            "{value} exceeds {decimals} decimals of precision"
        )));
    }
    let mantissa = U256::from(normalized.mantissa().unsigned_abs());
    let factor = U256::from(10u64).pow(U256::from(decimals - scale));
    mantissa
        .checked_mul(factor)
        .ok_or_else(|| CoreError::FixedPoint(format!("{value} overflows uint256")))
}

/// Convert a fixed-point integer back into a decimal.
///
/// # Errors
/// Fails when the value does not fit the 96-bit decimal mantissa.
pub fn from_fixed(value: U256, decimals: u32) -> Result<Decimal> {
    let raw: u128 = value
        .try_into()
        .map_err(|_| CoreError::FixedPoint(format!("{value} does not fit a decimal")))?;
    let raw = i128::try_from(raw)
        .map_err(|_| CoreError::FixedPoint(format!("{value} does not fit a decimal")))?;
    Decimal::try_from_i128_with_scale(raw, decimals)
        .map(|d| d.normalize())
        .map_err(|e| CoreError::FixedPoint(format!("{value}: {e}")))
}

/// Shorthand for 18-decimal conversion.
pub fn to_wad(value: Decimal) -> Result<U256> {
    to_fixed(value, WAD_DECIMALS)
}

/// Shorthand for 18-decimal conversion.
pub fn from_wad(value: U256) -> Result<Decimal> {
    from_fixed(value, WAD_DECIMALS)
}

/// Serde adapter writing `U256` as a base-10 string.
///
/// Accepts decimal strings, `0x` hex strings and plain JSON integers on input.
pub mod u256_dec {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(U256::from(n)),
            Raw::Text(s) => {
                let parsed = match s.strip_prefix("0x") {
                    Some(hex) => U256::from_str_radix(hex, 16),
                    None => U256::from_str_radix(&s, 10),
                };
                parsed.map_err(serde::de::Error::custom)
            }
        }
    }
}
