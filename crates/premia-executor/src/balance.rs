//! Collateral sufficiency for fill batches.
//!
//! Calls are collateralized in the base token and puts in the quote token.
//! Notional per fill is the trade size for calls and `size * strike` for puts.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Collateral one fill consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralDemand {
    /// Collateral token symbol.
    pub token: String,
    pub notional: Decimal,
}

impl CollateralDemand {
    pub fn for_fill(
        is_call: bool,
        base: &str,
        quote: &str,
        trade_size: Decimal,
        strike: Decimal,
    ) -> Self {
        if is_call {
            Self {
                token: base.to_string(),
                notional: trade_size,
            }
        } else {
            Self {
                token: quote.to_string(),
                notional: trade_size * strike,
            }
        }
    }
}

/// A collateral group whose demand exceeds the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralShortfall {
    pub token: String,
    pub required: Decimal,
    pub available: Decimal,
}

pub struct BalanceValidator;

impl BalanceValidator {
    /// Total demand per collateral token.
    pub fn required_by_token<'a>(
        demands: impl IntoIterator<Item = &'a CollateralDemand>,
    ) -> BTreeMap<String, Decimal> {
        let mut totals = BTreeMap::new();
        for demand in demands {
            *totals.entry(demand.token.clone()).or_insert(Decimal::ZERO) += demand.notional;
        }
        totals
    }

    /// Every group whose demand exceeds its balance. A token with no balance
    /// entry counts as zero.
    pub fn shortfalls<'a>(
        demands: impl IntoIterator<Item = &'a CollateralDemand>,
        balances: &HashMap<String, Decimal>,
    ) -> Vec<CollateralShortfall> {
        Self::required_by_token(demands)
            .into_iter()
            .filter_map(|(token, required)| {
                let available = balances.get(&token).copied().unwrap_or(Decimal::ZERO);
                (required > available).then_some(CollateralShortfall {
                    token,
                    required,
                    available,
                })
            })
            .collect()
    }

    /// `Ok` when every group is covered, otherwise all failing groups.
    pub fn validate<'a>(
        demands: impl IntoIterator<Item = &'a CollateralDemand>,
        balances: &HashMap<String, Decimal>,
    ) -> Result<(), Vec<CollateralShortfall>> {
        let shortfalls = Self::shortfalls(demands, balances);
        if shortfalls.is_empty() {
            Ok(())
        } else {
            Err(shortfalls)
        }
    }
}
