//! Executor error types.

use alloy::primitives::{Address, B256};
use premia_core::CoreError;
use premia_orderbook::OrderbookError;
use premia_registry::{ChainError, RegistryError};
use thiserror::Error;

use crate::balance::CollateralShortfall;
use crate::signer::SignerError;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Orderbook(#[from] OrderbookError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Insufficient collateral: {}", format_shortfalls(.0))]
    InsufficientCollateral(Vec<CollateralShortfall>),

    #[error("quote not found")]
    QuoteNotFound(B256),

    #[error("trade size exceeds fillable size")]
    ExceedsFillable,

    #[error("Option {0} has not expired")]
    NotExpired(String),

    #[error("No balance to settle for {0}")]
    NoBalanceToSettle(String),

    #[error("Nothing to annihilate for {0}")]
    NothingToAnnihilate(String),

    #[error("not quote provider")]
    NotQuoteProvider(B256),

    #[error("Chain sender {sender} does not match maker {maker}")]
    SenderMismatch { sender: Address, maker: Address },
}

fn format_shortfalls(shortfalls: &[CollateralShortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| format!("{} required {} available {}", s.token, s.required, s.available))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
