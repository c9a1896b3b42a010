//! Chain access and pool address resolution.
//!
//! - `ChainClient`: narrow contract-call interface to the chain node
//! - `RpcChainClient`: JSON-RPC implementation
//! - `TokenTable`: symbol/address lookup from chain configuration
//! - `PoolKeyResolver`: pool key derivation with a memoizing address cache

pub mod abi;
pub mod chain;
pub mod error;
pub mod resolver;
pub mod rpc;
pub mod tokens;

pub use chain::{BoxFuture, ChainClient, ContractCall, MockChainClient};
pub use error::{ChainError, ChainResult, RegistryError, RegistryResult};
pub use resolver::PoolKeyResolver;
pub use rpc::RpcChainClient;
pub use tokens::{ChainConfig, TokenConfig, TokenTable};
