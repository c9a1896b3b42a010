//! Registry and chain error types.

use alloy::primitives::{Address, B256};
use premia_core::CoreError;
use thiserror::Error;

/// Failures talking to the chain node.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction {0} reverted")]
    Reverted(B256),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Failed to decode RPC response: {0}")]
    Decode(String),

    #[error("Failed to sign transaction: {0}")]
    Signing(String),
}

impl ChainError {
    /// Whether the same call may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Unknown token symbol: {0}")]
    UnknownToken(String),

    #[error("Invalid option: {0}")]
    InvalidDescriptor(String),

    #[error("Duplicate token in chain configuration: {0}")]
    DuplicateToken(String),

    #[error("Pool lookup failed: {0}")]
    PoolLookupFailed(String),

    #[error("Pool {0} is not deployed")]
    PoolNotDeployed(Address),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
