//! Quote signing and batch settlement for the Premia gateway.
//!
//! - `QuoteSigner`: EIP-712 typed-data signing of quotes
//! - `BalanceValidator`: collateral sufficiency per token group
//! - `SettlementOrchestrator`: fail-isolated batch execution
//! - `RetryPolicy`: bounded retries for auxiliary chain reads

pub mod balance;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod salt;
pub mod signer;

pub use balance::{BalanceValidator, CollateralDemand, CollateralShortfall};
pub use error::{ExecutorError, ExecutorResult};
pub use orchestrator::{
    ApprovalAmount, ApprovalRecord, ApprovalRequest, OrchestratorConfig, PoolAction,
    PoolTransaction, QuoteLookup, SettlementOrchestrator, TokenBalance,
};
pub use retry::RetryPolicy;
pub use salt::{Clock, ManualClock, SaltGenerator, SystemClock};
pub use signer::{
    compute_digest, compute_struct_hash, message_for, recover_signer, split_signature, verify,
    KeyError, KeyManager, KeySource, QuoteSigner, SignerError, TypedDataSigner, TypedMessage,
};
