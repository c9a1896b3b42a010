//! JSON-RPC implementation of `ChainClient`.
//!
//! Reads go through `eth_call`. Writes are EIP-1559 transactions signed
//! locally with the maker key and submitted with `eth_sendRawTransaction`,
//! so the account that signs quotes is the account that fills, cancels and
//! settles them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use premia_core::{PoolAddress, PoolKey, TokenType};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::abi::{IERC20, IOracleAdapter, IPool, IPoolFactory};
use crate::chain::{BoxFuture, ChainClient, ContractCall};
use crate::error::{ChainError, ChainResult};
use crate::tokens::ChainConfig;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    block_number: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    timestamp: String,
}

/// Parse a `0x`-prefixed hex quantity.
fn parse_quantity(value: &str) -> ChainResult<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::Decode(format!("invalid quantity {value}: {e}")))
}

fn parse_quantity_u128(value: &str) -> ChainResult<u128> {
    u128::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::Decode(format!("invalid quantity {value}: {e}")))
}

/// Fee and gas parameters of one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParams {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl GasParams {
    /// Derive limits from node estimates: 20% headroom on gas, twice the
    /// current gas price as the fee cap.
    pub fn from_estimates(estimated_gas: u64, gas_price: u128, priority_fee: u128) -> Self {
        let max_fee_per_gas = gas_price.saturating_mul(2);
        Self {
            gas_limit: estimated_gas.saturating_add(estimated_gas / 5),
            max_fee_per_gas,
            max_priority_fee_per_gas: priority_fee.min(max_fee_per_gas),
        }
    }
}

/// Build and sign an EIP-1559 call, returning the 2718-encoded envelope.
pub fn sign_call(
    wallet: &PrivateKeySigner,
    chain_id: u64,
    nonce: u64,
    gas: GasParams,
    call: &ContractCall,
) -> ChainResult<Bytes> {
    let mut tx = TxEip1559 {
        chain_id,
        nonce,
        gas_limit: gas.gas_limit,
        max_fee_per_gas: gas.max_fee_per_gas,
        max_priority_fee_per_gas: gas.max_priority_fee_per_gas,
        to: TxKind::Call(call.to),
        value: U256::ZERO,
        access_list: Default::default(),
        input: call.data.clone(),
    };
    let signature = wallet
        .sign_transaction_sync(&mut tx)
        .map_err(|e| ChainError::Signing(e.to_string()))?;
    let envelope = TxEnvelope::from(tx.into_signed(signature));
    Ok(Bytes::from(envelope.encoded_2718()))
}

/// Chain client speaking Ethereum JSON-RPC over HTTP.
pub struct RpcChainClient {
    client: Client,
    rpc_url: String,
    chain_id: u64,
    pool_factory: Address,
    oracle_adapter: Address,
    wallet: PrivateKeySigner,
    /// Next nonce to use. `None` until read from the node, and again after a
    /// failed submission so the next write re-syncs.
    nonce: Mutex<Option<u64>>,
    poll_interval: Duration,
    confirmation_timeout: Duration,
    next_id: AtomicU64,
}

impl RpcChainClient {
    /// `wallet` signs every transaction; its address is the sender.
    pub fn new(config: &ChainConfig, wallet: PrivateKeySigner) -> ChainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ChainError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
            chain_id: config.chain_id,
            pool_factory: config.pool_factory,
            oracle_adapter: config.oracle_adapter,
            wallet,
            nonce: Mutex::new(None),
            poll_interval: Duration::from_millis(config.confirmation_poll_ms),
            confirmation_timeout: Duration::from_millis(config.confirmation_timeout_ms),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Transport(format!("{method}: HTTP {status}: {body}")));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("{method}: {e}")))?;

        if let Some(error) = body.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| ChainError::Decode(format!("{method}: {e}")))
    }

    async fn eth_call<C: SolCall>(&self, to: Address, call: &C) -> ChainResult<C::Return> {
        let data = Bytes::from(call.abi_encode());
        let raw: Bytes = self
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        C::abi_decode_returns(&raw, true).map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn quantity(&self, method: &str, params: Value) -> ChainResult<u128> {
        let raw: String = self.request(method, params).await?;
        parse_quantity_u128(&raw)
    }

    async fn gas_params(&self, call: &ContractCall) -> ChainResult<GasParams> {
        let estimated = self
            .quantity(
                "eth_estimateGas",
                json!([{ "from": self.wallet.address(), "to": call.to, "data": call.data }]),
            )
            .await?;
        let gas_price = self.quantity("eth_gasPrice", json!([])).await?;
        let priority_fee = self.quantity("eth_maxPriorityFeePerGas", json!([])).await?;
        let estimated = u64::try_from(estimated)
            .map_err(|_| ChainError::Decode(format!("gas estimate {estimated} out of range")))?;
        Ok(GasParams::from_estimates(estimated, gas_price, priority_fee))
    }
}

impl ChainClient for RpcChainClient {
    fn sender(&self) -> Address {
        self.wallet.address()
    }

    fn get_pool_address<'a>(
        &'a self,
        key: &'a PoolKey,
    ) -> BoxFuture<'a, ChainResult<PoolAddress>> {
        Box::pin(async move {
            let call = IPoolFactory::getPoolAddressCall { k: key.into() };
            let ret = self.eth_call(self.pool_factory, &call).await?;
            Ok(PoolAddress {
                address: ret.pool,
                deployed: ret.isDeployed,
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
            let call = IPool::balanceOfCall {
                account: holder,
                id: token_type.id(),
            };
            Ok(self.eth_call(pool, &call).await?._0)
        })
    }

    fn token_balance(&self, token: Address, holder: Address) -> BoxFuture<'_, ChainResult<U256>> {
        Box::pin(async move {
            let call = IERC20::balanceOfCall { account: holder };
            Ok(self.eth_call(token, &call).await?._0)
        })
    }

    fn spot_price(&self, base: Address, quote: Address) -> BoxFuture<'_, ChainResult<U256>> {
        Box::pin(async move {
            let call = IOracleAdapter::getPriceCall {
                tokenIn: base,
                tokenOut: quote,
            };
            Ok(self.eth_call(self.oracle_adapter, &call).await?._0)
        })
    }

    fn latest_block_number(&self) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move {
            let raw: String = self.request("eth_blockNumber", json!([])).await?;
            parse_quantity(&raw)
        })
    }

    fn block_timestamp(&self, number: u64) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move {
            let block: Option<BlockHeader> = self
                .request(
                    "eth_getBlockByNumber",
                    json!([format!("0x{number:x}"), false]),
                )
                .await?;
            let block = block.ok_or_else(|| ChainError::Rpc {
                code: -32000,
                message: format!("block {number} not found"),
            })?;
            parse_quantity(&block.timestamp)
        })
    }

    fn transact(&self, call: ContractCall) -> BoxFuture<'_, ChainResult<B256>> {
        Box::pin(async move {
            // Held until submission so concurrent writes take consecutive nonces.
            let mut next_nonce = self.nonce.lock().await;
            let nonce = match *next_nonce {
                Some(nonce) => nonce,
                None => {
                    let raw: String = self
                        .request(
                            "eth_getTransactionCount",
                            json!([self.wallet.address(), "pending"]),
                        )
                        .await?;
                    parse_quantity(&raw)?
                }
            };

            let gas = self.gas_params(&call).await?;
            let raw = sign_call(&self.wallet, self.chain_id, nonce, gas, &call)?;
            debug!(to = %call.to, method = call.label, nonce, "Sending transaction");

            match self
                .request::<B256>("eth_sendRawTransaction", json!([raw]))
                .await
            {
                Ok(hash) => {
                    *next_nonce = Some(nonce + 1);
                    info!(to = %call.to, method = call.label, nonce, tx = %hash, "Transaction sent");
                    Ok(hash)
                }
                Err(e) => {
                    *next_nonce = None;
                    warn!(to = %call.to, method = call.label, nonce, error = %e, "Transaction rejected");
                    Err(e)
                }
            }
        })
    }

    fn wait_for_confirmation(
        &self,
        tx: B256,
        confirmations: u64,
    ) -> BoxFuture<'_, ChainResult<()>> {
        Box::pin(async move {
            let started = Instant::now();
            loop {
                let receipt: Option<Receipt> = self
                    .request("eth_getTransactionReceipt", json!([tx]))
                    .await?;

                if let Some(Receipt {
                    block_number: Some(block_number),
                    status,
                }) = receipt
                {
                    if status.as_deref() == Some("0x0") {
                        warn!(tx = %tx, "Transaction reverted");
                        return Err(ChainError::Reverted(tx));
                    }
                    let mined_at = parse_quantity(&block_number)?;
                    let head = self.latest_block_number().await?;
                    if head.saturating_sub(mined_at) + 1 >= confirmations {
                        debug!(tx = %tx, block = mined_at, "Transaction confirmed");
                        return Ok(());
                    }
                }

                if started.elapsed() >= self.confirmation_timeout {
                    return Err(ChainError::Timeout(format!(
                        "{tx} not confirmed after {}ms",
                        self.confirmation_timeout.as_millis()
                    )));
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        })
    }
}
