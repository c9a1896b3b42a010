//! Contract-call interface to the chain node.
//!
//! The orchestrator and resolver only see this trait. `RpcChainClient`
//! implements it over JSON-RPC; `MockChainClient` is an in-memory double.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::SolValue;
use parking_lot::Mutex;
use premia_core::{PoolAddress, PoolKey, TokenType};

use crate::abi;
use crate::error::{ChainError, ChainResult};

/// Boxed future type for trait methods (avoiding async_trait dependency).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An encoded state-changing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    /// Method name, for logs.
    pub label: &'static str,
}

/// Chain operations used by the gateway.
pub trait ChainClient: Send + Sync {
    /// Account that signs and sends transactions.
    fn sender(&self) -> Address;

    /// Pool factory lookup.
    fn get_pool_address<'a>(&'a self, key: &'a PoolKey)
        -> BoxFuture<'a, ChainResult<PoolAddress>>;

    /// ERC-1155 position balance of `holder` in `pool`.
    fn balance_of(
        &self,
        pool: Address,
        holder: Address,
        token_type: TokenType,
    ) -> BoxFuture<'_, ChainResult<U256>>;

    /// ERC-20 balance of `holder`.
    fn token_balance(&self, token: Address, holder: Address) -> BoxFuture<'_, ChainResult<U256>>;

    /// Oracle spot price of `base` in `quote`, 18-decimal fixed point.
    fn spot_price(&self, base: Address, quote: Address) -> BoxFuture<'_, ChainResult<U256>>;

    fn latest_block_number(&self) -> BoxFuture<'_, ChainResult<u64>>;

    fn block_timestamp(&self, number: u64) -> BoxFuture<'_, ChainResult<u64>>;

    /// Send a transaction, returning its hash.
    fn transact(&self, call: ContractCall) -> BoxFuture<'_, ChainResult<B256>>;

    /// Wait until `tx` is mined with at least `confirmations` blocks.
    fn wait_for_confirmation(&self, tx: B256, confirmations: u64)
        -> BoxFuture<'_, ChainResult<()>>;
}

/// In-memory chain for tests.
///
/// Unknown pool keys resolve to an address derived from the key hash.
/// Position and token balances default to zero.
#[derive(Debug)]
pub struct MockChainClient {
    sender: Address,
    default_deployed: Mutex<bool>,
    pools: Mutex<HashMap<PoolKey, PoolAddress>>,
    lookup_failures: Mutex<VecDeque<ChainError>>,
    lookup_count: AtomicUsize,
    lookup_delay: Mutex<Option<Duration>>,
    positions: Mutex<HashMap<(Address, TokenType), U256>>,
    token_balances: Mutex<HashMap<Address, U256>>,
    spot_results: Mutex<VecDeque<ChainResult<U256>>>,
    spot_price: Mutex<U256>,
    genesis_timestamp: u64,
    block_time_secs: u64,
    head_block: u64,
    reverting: Mutex<HashSet<Address>>,
    transactions: Mutex<Vec<ContractCall>>,
    tx_counter: AtomicU64,
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new(Address::repeat_byte(0xee))
    }
}

impl MockChainClient {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            default_deployed: Mutex::new(true),
            pools: Mutex::new(HashMap::new()),
            lookup_failures: Mutex::new(VecDeque::new()),
            lookup_count: AtomicUsize::new(0),
            lookup_delay: Mutex::new(None),
            positions: Mutex::new(HashMap::new()),
            token_balances: Mutex::new(HashMap::new()),
            spot_results: Mutex::new(VecDeque::new()),
            spot_price: Mutex::new(U256::ZERO),
            genesis_timestamp: 1_700_000_000,
            block_time_secs: 12,
            head_block: 1_000_000,
            reverting: Mutex::new(HashSet::new()),
            transactions: Mutex::new(Vec::new()),
            tx_counter: AtomicU64::new(0),
        }
    }

    /// Address the mock reports for `key` unless overridden.
    pub fn derived_pool_address(key: &PoolKey) -> Address {
        let encoded = abi::PoolKey::from(key).abi_encode();
        Address::from_slice(&keccak256(encoded)[12..])
    }

    /// Deployment status for keys without an explicit entry.
    pub fn set_default_deployed(&self, deployed: bool) {
        *self.default_deployed.lock() = deployed;
    }

    pub fn set_pool(&self, key: PoolKey, pool: PoolAddress) {
        self.pools.lock().insert(key, pool);
    }

    /// Queue an error returned by the next factory lookup.
    pub fn push_lookup_failure(&self, error: ChainError) {
        self.lookup_failures.lock().push_back(error);
    }

    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock() = Some(delay);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    /// Position balance of the sender.
    pub fn set_position(&self, pool: Address, token_type: TokenType, amount: U256) {
        self.positions.lock().insert((pool, token_type), amount);
    }

    /// ERC-20 balance of the sender.
    pub fn set_token_balance(&self, token: Address, amount: U256) {
        self.token_balances.lock().insert(token, amount);
    }

    pub fn set_spot_price(&self, price: U256) {
        *self.spot_price.lock() = price;
    }

    /// Queue a result returned by the next spot price read.
    pub fn push_spot_result(&self, result: ChainResult<U256>) {
        self.spot_results.lock().push_back(result);
    }

    /// Make every transaction sent to `to` revert.
    pub fn revert_calls_to(&self, to: Address) {
        self.reverting.lock().insert(to);
    }

    /// Calls sent so far.
    pub fn transactions(&self) -> Vec<ContractCall> {
        self.transactions.lock().clone()
    }
}

impl ChainClient for MockChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    fn get_pool_address<'a>(
        &'a self,
        key: &'a PoolKey,
    ) -> BoxFuture<'a, ChainResult<PoolAddress>> {
        Box::pin(async move {
            self.lookup_count.fetch_add(1, Ordering::SeqCst);
            let delay = *self.lookup_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = self.lookup_failures.lock().pop_front() {
                return Err(error);
            }
            if let Some(pool) = self.pools.lock().get(key) {
                return Ok(*pool);
            }
            Ok(PoolAddress {
                address: Self::derived_pool_address(key),
                deployed: *self.default_deployed.lock(),
            })
        })
    }

    fn balance_of(
        &self,
        pool: Address,
        holder: Address,
        token_type: TokenType,
    ) -> BoxFuture<'_, ChainResult<U256>> {
        Box::pin(async move {
            if holder != self.sender {
                return Ok(U256::ZERO);
            }
            Ok(self
                .positions
                .lock()
                .get(&(pool, token_type))
                .copied()
                .unwrap_or_default())
        })
    }

    fn token_balance(&self, token: Address, holder: Address) -> BoxFuture<'_, ChainResult<U256>> {
        Box::pin(async move {
            if holder != self.sender {
                return Ok(U256::ZERO);
            }
            Ok(self
                .token_balances
                .lock()
                .get(&token)
                .copied()
                .unwrap_or_default())
        })
    }

    fn spot_price(&self, _base: Address, _quote: Address) -> BoxFuture<'_, ChainResult<U256>> {
        Box::pin(async move {
            if let Some(result) = self.spot_results.lock().pop_front() {
                return result;
            }
            Ok(*self.spot_price.lock())
        })
    }

    fn latest_block_number(&self) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move { Ok(self.head_block) })
    }

    fn block_timestamp(&self, number: u64) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move {
            if number > self.head_block {
                return Err(ChainError::Rpc {
                    code: -32000,
                    message: format!("block {number} not found"),
                });
            }
            Ok(self.genesis_timestamp + number * self.block_time_secs)
        })
    }

    fn transact(&self, call: ContractCall) -> BoxFuture<'_, ChainResult<B256>> {
        Box::pin(async move {
            let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
            let mut preimage = call.data.to_vec();
            preimage.extend_from_slice(&n.to_be_bytes());
            let hash = keccak256(&preimage);
            let reverts = self.reverting.lock().contains(&call.to);
            self.transactions.lock().push(call);
            if reverts {
                return Err(ChainError::Reverted(hash));
            }
            Ok(hash)
        })
    }

    fn wait_for_confirmation(
        &self,
        _tx: B256,
        _confirmations: u64,
    ) -> BoxFuture<'_, ChainResult<()>> {
        Box::pin(async move { Ok(()) })
    }
}
