//! Chain configuration and the token table.

use std::collections::HashMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// A token known to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// Per-chain contract addresses and token list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    pub pool_factory: Address,
    /// The chain's single oracle adapter, part of every pool key.
    pub oracle_adapter: Address,
    /// Spender approved for collateral transfers.
    pub erc20_router: Address,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    /// RPC request timeout (ms). Default: 10,000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Receipt polling interval (ms). Default: 2,000.
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
    /// Give up waiting for confirmations after this long (ms). Default: 120,000.
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_confirmation_poll_ms() -> u64 {
    2_000
}

fn default_confirmation_timeout_ms() -> u64 {
    120_000
}

/// Bidirectional symbol/address lookup.
///
/// Symbols are matched case-insensitively. Construction rejects duplicate
/// symbols and duplicate addresses so that the mapping stays injective.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    by_symbol: HashMap<String, TokenConfig>,
    by_address: HashMap<Address, TokenConfig>,
}

impl TokenTable {
    pub fn new(tokens: &[TokenConfig]) -> RegistryResult<Self> {
        let mut table = Self::default();
        for token in tokens {
            let key = token.symbol.to_ascii_uppercase();
            if table.by_symbol.contains_key(&key) {
                return Err(RegistryError::DuplicateToken(token.symbol.clone()));
            }
            if table.by_address.contains_key(&token.address) {
                return Err(RegistryError::DuplicateToken(token.address.to_string()));
            }
            table.by_symbol.insert(key, token.clone());
            table.by_address.insert(token.address, token.clone());
        }
        Ok(table)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&TokenConfig> {
        self.by_symbol.get(&symbol.to_ascii_uppercase())
    }

    pub fn by_address(&self, address: &Address) -> Option<&TokenConfig> {
        self.by_address.get(address)
    }

    /// Look up a symbol, failing with `UnknownToken`.
    pub fn require(&self, symbol: &str) -> RegistryResult<&TokenConfig> {
        self.by_symbol(symbol)
            .ok_or_else(|| RegistryError::UnknownToken(symbol.to_string()))
    }

    /// Symbol for an address, if configured.
    pub fn symbol_of(&self, address: &Address) -> Option<&str> {
        self.by_address(address).map(|t| t.symbol.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenConfig> {
        self.by_address.values()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}
