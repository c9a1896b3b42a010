//! Core domain types for the Premia options gateway.
//!
//! This crate provides the types shared by every other crate:
//! - `OptionDescriptor`, `PoolKey`: option series and pool identifiers
//! - `QuoteRequest`, `SignedQuote`, `FillRequest`: quote lifecycle types
//! - `BatchResult`, `CancelResult`: partitioned batch outcomes
//! - `maturity`: expiration calendar rules
//! - `decimal`: fixed-point conversion

pub mod batch;
pub mod decimal;
pub mod error;
pub mod maturity;
pub mod option;
pub mod quote;

pub use batch::{check_batch_size, BatchResult, CancelResult, FailedItem, MAX_BATCH_SIZE};
pub use decimal::{from_fixed, from_wad, to_fixed, to_wad, WAD_DECIMALS};
pub use error::{CoreError, ExpirationError, Result};
pub use maturity::{
    compute_maturity, compute_maturity_at, list_maturities, list_maturities_at, parse_maturity,
    MaturityEntry,
};
pub use option::{OptionDescriptor, OptionType, PoolAddress, PoolKey, TokenType};
pub use quote::{FillRequest, QuoteRequest, Side, SignedQuote, SplitSignature, MIN_DEADLINE_SECS};
