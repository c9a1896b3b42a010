//! Batch orchestration of quote and pool operations.
//!
//! Every batch endpoint follows the same shape: reject the whole batch on
//! batch-level violations, run one future per item, join them all and
//! partition the outcomes in input order. A failing item never affects its
//! siblings.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use chrono::Utc;
use futures_util::future::{join_all, try_join_all};
use premia_core::{
    check_batch_size, from_fixed, from_wad, to_fixed, to_wad, BatchResult, CancelResult, CoreError,
    FailedItem, FillRequest, OptionDescriptor, OptionType, PoolKey, QuoteRequest, Side, TokenType,
    MAX_BATCH_SIZE, MIN_DEADLINE_SECS,
};
use premia_orderbook::{
    normalize_post_response, normalize_quotes, NormalizedPostResponse, NormalizedQuote,
    OrderQuery, OrderbookApi, OrderbookQuote, QuoteQuery,
};
use premia_registry::abi::{self, IPool, IERC20};
use premia_registry::{ChainClient, ContractCall, PoolKeyResolver, RegistryError};
use premia_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::balance::{BalanceValidator, CollateralDemand};
use crate::error::{ExecutorError, ExecutorResult};
use crate::retry::{self, RetryPolicy};
use crate::signer::QuoteSigner;

/// Orchestrator limits and chain parameters.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub chain_id: u64,
    /// Cap on fill, cancel and order lookup batches.
    pub max_batch_size: usize,
    pub min_deadline_secs: u64,
    /// Confirmations awaited after every write.
    pub confirmations: u64,
    /// Spender approved by collateral approvals.
    pub erc20_router: Address,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chain_id: 42161,
            max_batch_size: MAX_BATCH_SIZE,
            min_deadline_secs: MIN_DEADLINE_SECS,
            confirmations: 1,
            erc20_router: Address::ZERO,
            retry: RetryPolicy::default(),
        }
    }
}

/// Pool-level operations on a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolAction {
    Settle,
    Exercise,
    Annihilate,
}

impl PoolAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settle => "settle",
            Self::Exercise => "exercise",
            Self::Annihilate => "annihilate",
        }
    }
}

impl fmt::Display for PoolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mined pool transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolTransaction {
    pub option: OptionDescriptor,
    pub pool_address: Address,
    pub tx_hash: B256,
}

/// Approval amount: an exact decimal or `"max"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAmount {
    Max,
    Exact(Decimal),
}

impl Serialize for ApprovalAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Max => serializer.serialize_str("max"),
            Self::Exact(amount) => serializer.serialize_str(&amount.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ApprovalAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(Decimal),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) if text.eq_ignore_ascii_case("max") => Ok(Self::Max),
            Raw::Text(text) => Decimal::from_str(text.trim())
                .map(Self::Exact)
                .map_err(serde::de::Error::custom),
            Raw::Number(amount) => Ok(Self::Exact(amount)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub token: String,
    pub amount: ApprovalAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub token: String,
    pub spender: Address,
    pub tx_hash: B256,
}

/// ERC-20 balance of the gateway wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub address: Address,
    pub balance: Decimal,
}

/// Best-quotes lookup for one option series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLookup {
    pub base: String,
    pub quote: String,
    pub expiration: String,
    pub strike: Decimal,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub size: Decimal,
    pub side: Side,
    #[serde(default)]
    pub provider: Option<Address>,
    #[serde(default)]
    pub taker: Option<Address>,
}

impl QuoteLookup {
    pub fn descriptor(&self) -> OptionDescriptor {
        OptionDescriptor {
            base: self.base.clone(),
            quote: self.quote.clone(),
            expiration: self.expiration.clone(),
            strike: self.strike,
            option_type: self.option_type,
        }
    }
}

/// A fill matched to its active quote.
struct FillPlan {
    quote: OrderbookQuote,
    size: U256,
    demand: CollateralDemand,
    collateral: Address,
}

/// Drives batch operations against the orderbook and the chain.
pub struct SettlementOrchestrator {
    resolver: Arc<PoolKeyResolver>,
    signer: Arc<QuoteSigner>,
    orderbook: Arc<dyn OrderbookApi>,
    config: OrchestratorConfig,
}

impl SettlementOrchestrator {
    /// Fails unless the chain client sends from the quote signer's account.
    /// Cancels, fills and collateral reads all act for the transaction sender.
    pub fn new(
        resolver: Arc<PoolKeyResolver>,
        signer: Arc<QuoteSigner>,
        orderbook: Arc<dyn OrderbookApi>,
        config: OrchestratorConfig,
    ) -> ExecutorResult<Self> {
        let sender = resolver.chain().sender();
        let maker = signer.address();
        if sender != maker {
            return Err(ExecutorError::SenderMismatch { sender, maker });
        }
        Ok(Self {
            resolver,
            signer,
            orderbook,
            config,
        })
    }

    pub fn resolver(&self) -> &Arc<PoolKeyResolver> {
        &self.resolver
    }

    pub fn signer(&self) -> &Arc<QuoteSigner> {
        &self.signer
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn chain(&self) -> &Arc<dyn ChainClient> {
        self.resolver.chain()
    }

    // =========================================================================
    // Orderbook operations
    // =========================================================================

    /// Validate, sign and publish quotes.
    ///
    /// The first validation error rejects the batch before anything is signed.
    pub async fn post_quotes(
        &self,
        requests: Vec<QuoteRequest>,
    ) -> ExecutorResult<NormalizedPostResponse> {
        let started = Instant::now();
        check_batch_size(requests.len(), usize::MAX)?;

        let keys = requests
            .iter()
            .map(|request| -> ExecutorResult<PoolKey> {
                request.validate(self.config.min_deadline_secs)?;
                Ok(self.resolver.derive(&request.descriptor())?)
            })
            .collect::<ExecutorResult<Vec<_>>>()?;

        let signed = try_join_all(requests.iter().zip(keys).map(|(request, key)| async move {
            let pool = self.resolver.resolve_address(&key).await?;
            Ok::<_, ExecutorError>(self.signer.issue(request, key, pool.address).await?)
        }))
        .await?;

        let response = self.orderbook.post_quotes(signed).await.map_err(|e| {
            Metrics::upstream_error("orderbook");
            warn!(error = %e, "Orderbook rejected quote batch");
            e
        })?;

        Metrics::batch_items("post", "created", response.created.len());
        Metrics::batch_items("post", "failed", response.failed.len());
        Metrics::batch_items("post", "exists", response.exists.len());
        Metrics::batch_latency("post", started.elapsed().as_secs_f64() * 1000.0);
        info!(
            created = response.created.len(),
            failed = response.failed.len(),
            exists = response.exists.len(),
            "Posted quotes"
        );

        Ok(normalize_post_response(&response, self.resolver.tokens())?)
    }

    /// Best active quotes for a series, up to the requested size.
    pub async fn get_quotes(&self, lookup: &QuoteLookup) -> ExecutorResult<Vec<NormalizedQuote>> {
        if lookup.size <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "size is invalid (must be greater than 0)".to_string(),
            )
            .into());
        }
        let key = self.resolver.derive(&lookup.descriptor())?;
        let pool = self.resolver.resolve_address(&key).await?;

        let quotes = self
            .orderbook
            .get_quotes(QuoteQuery {
                pool_address: pool.address,
                chain_id: self.config.chain_id,
                size: to_wad(lookup.size)?,
                side: lookup.side,
                provider: lookup.provider,
                taker: lookup.taker,
            })
            .await?;
        Ok(normalize_quotes(&quotes, self.resolver.tokens())?)
    }

    /// Active quotes by id (at most one batch) or by provider.
    pub async fn get_orders(
        &self,
        quote_ids: Option<Vec<B256>>,
        provider: Option<Address>,
    ) -> ExecutorResult<Vec<NormalizedQuote>> {
        let chain_id = self.config.chain_id;
        let query = match (quote_ids, provider) {
            (Some(quote_ids), _) => {
                check_batch_size(quote_ids.len(), self.config.max_batch_size)?;
                OrderQuery::ByIds {
                    chain_id,
                    quote_ids,
                }
            }
            (None, Some(provider)) => OrderQuery::ByProvider { chain_id, provider },
            (None, None) => {
                return Err(CoreError::Validation(
                    "either quoteIds or provider is required".to_string(),
                )
                .into())
            }
        };
        let quotes = self.orderbook.get_orders(query).await?;
        Ok(normalize_quotes(&quotes, self.resolver.tokens())?)
    }

    async fn fetch_active(
        &self,
        quote_ids: Vec<B256>,
    ) -> ExecutorResult<HashMap<B256, OrderbookQuote>> {
        let quotes = self
            .orderbook
            .get_orders(OrderQuery::ByIds {
                chain_id: self.config.chain_id,
                quote_ids,
            })
            .await
            .map_err(|e| {
                Metrics::upstream_error("orderbook");
                e
            })?;
        Ok(quotes.into_iter().map(|q| (q.quote_id, q)).collect())
    }

    // =========================================================================
    // Fills
    // =========================================================================

    /// Fill active quotes on-chain.
    ///
    /// Fills are matched against freshly fetched quotes, checked for
    /// collateral per token group, then executed concurrently.
    pub async fn fill_quotes(&self, fills: Vec<FillRequest>) -> ExecutorResult<BatchResult<B256>> {
        let started = Instant::now();
        check_batch_size(fills.len(), self.config.max_batch_size)?;

        let active = self
            .fetch_active(fills.iter().map(|f| f.quote_id).collect())
            .await?;

        let mut plans: Vec<Result<FillPlan, String>> = fills
            .iter()
            .map(|fill| self.plan_fill(fill, &active).map_err(|e| e.to_string()))
            .collect();

        self.apply_collateral_checks(&mut plans).await;

        let outcomes = join_all(plans.into_iter().map(|plan| async move {
            let plan = plan?;
            let quote_id = plan.quote.quote_id;
            self.execute_fill(plan)
                .await
                .map(|_| quote_id)
                .map_err(|e| e.to_string())
        }))
        .await;

        let result = BatchResult::partition(fills.iter().map(|f| f.quote_id).zip(outcomes));
        self.record_batch("fill", result.success.len(), result.failed.len(), started);
        Ok(result)
    }

    fn plan_fill(
        &self,
        fill: &FillRequest,
        active: &HashMap<B256, OrderbookQuote>,
    ) -> ExecutorResult<FillPlan> {
        let quote = active
            .get(&fill.quote_id)
            .ok_or(ExecutorError::QuoteNotFound(fill.quote_id))?;
        if fill.trade_size <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "trade size is invalid (must be greater than 0)".to_string(),
            )
            .into());
        }
        let size = to_wad(fill.trade_size)?;
        if size > quote.fillable_size {
            return Err(ExecutorError::ExceedsFillable);
        }

        let key = &quote.pool_key;
        let tokens = self.resolver.tokens();
        let symbol = |address: &Address| {
            tokens
                .symbol_of(address)
                .ok_or_else(|| RegistryError::UnknownToken(address.to_string()))
        };
        let base = symbol(&key.base)?;
        let quote_symbol = symbol(&key.quote)?;
        let strike = from_wad(key.strike)?;

        Ok(FillPlan {
            quote: quote.clone(),
            size,
            demand: CollateralDemand::for_fill(
                key.is_call_pool,
                base,
                quote_symbol,
                fill.trade_size,
                strike,
            ),
            collateral: if key.is_call_pool { key.base } else { key.quote },
        })
    }

    /// Fail every planned fill whose collateral group is not covered.
    async fn apply_collateral_checks(&self, plans: &mut [Result<FillPlan, String>]) {
        let tokens: BTreeSet<Address> = plans
            .iter()
            .filter_map(|p| p.as_ref().ok().map(|p| p.collateral))
            .collect();
        if tokens.is_empty() {
            return;
        }

        let reads = join_all(tokens.into_iter().map(|token| async move {
            (token, self.wallet_balance(token).await)
        }))
        .await;

        let mut balances = HashMap::new();
        let mut read_errors = HashMap::new();
        for (token, read) in reads {
            match read {
                Ok(balance) => {
                    balances.insert(balance.symbol, balance.balance);
                }
                Err(e) => {
                    warn!(%token, error = %e, "Collateral balance read failed");
                    read_errors.insert(token, e.to_string());
                }
            }
        }

        for plan in plans.iter_mut() {
            let failed = match plan {
                Ok(p) => read_errors.get(&p.collateral).cloned(),
                Err(_) => None,
            };
            if let Some(reason) = failed {
                *plan = Err(reason);
            }
        }

        let shortfalls = BalanceValidator::shortfalls(
            plans.iter().filter_map(|p| p.as_ref().ok().map(|p| &p.demand)),
            &balances,
        );
        for shortfall in shortfalls {
            warn!(
                token = %shortfall.token,
                required = %shortfall.required,
                available = %shortfall.available,
                "Insufficient collateral for fill group"
            );
            let reason = ExecutorError::InsufficientCollateral(vec![shortfall.clone()]).to_string();
            for plan in plans.iter_mut() {
                let in_group = matches!(plan, Ok(p) if p.demand.token == shortfall.token);
                if in_group {
                    *plan = Err(reason.clone());
                }
            }
        }
    }

    async fn execute_fill(&self, plan: FillPlan) -> ExecutorResult<B256> {
        let quote = plan.quote;
        let pool = self.resolver.require_deployed(&quote.pool_key).await?;
        let call = IPool::fillQuoteOBCall {
            quoteOB: abi::QuoteOB {
                provider: quote.provider,
                taker: quote.taker,
                price: quote.price,
                size: quote.size,
                isBuy: quote.is_buy,
                deadline: U256::from(quote.deadline),
                salt: U256::from(quote.salt),
            },
            size: plan.size,
            signature: abi::Signature {
                v: quote.signature.v,
                r: quote.signature.r,
                s: quote.signature.s,
            },
            referrer: Address::ZERO,
        };
        self.send(pool, call.abi_encode(), "fillQuoteOB").await
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Cancel active quotes, one contract call per pool.
    ///
    /// Ids that match no active quote are reported as omitted. Quotes from
    /// another provider fail without a call: the pool cancels hashes for the
    /// transaction sender only.
    pub async fn cancel_quotes(&self, quote_ids: Vec<B256>) -> ExecutorResult<CancelResult<B256>> {
        let started = Instant::now();
        check_batch_size(quote_ids.len(), self.config.max_batch_size)?;

        let active = self.fetch_active(quote_ids.clone()).await?;
        let maker = self.signer.address();

        let mut result = CancelResult::default();
        let mut by_pool: BTreeMap<Address, Vec<B256>> = BTreeMap::new();
        for id in quote_ids {
            match active.get(&id) {
                Some(quote) if quote.provider != maker => {
                    debug!(quote_id = %id, provider = %quote.provider, "Skipping foreign quote");
                    result
                        .failed
                        .push(FailedItem::new(id, ExecutorError::NotQuoteProvider(id).to_string()));
                }
                Some(quote) => by_pool.entry(quote.pool_address).or_default().push(id),
                None => result.omitted.push(id),
            }
        }

        let outcomes = join_all(by_pool.into_iter().map(|(pool, hashes)| async move {
            let call = IPool::cancelQuotesOBCall {
                hashes: hashes.clone(),
            };
            let outcome = self.send(pool, call.abi_encode(), "cancelQuotesOB").await;
            (hashes, outcome)
        }))
        .await;

        for (hashes, outcome) in outcomes {
            match outcome {
                Ok(_) => result.success.extend(hashes),
                Err(e) => {
                    let reason = e.to_string();
                    for hash in hashes {
                        result.failed.push(FailedItem::new(hash, reason.clone()));
                    }
                }
            }
        }

        self.record_batch("cancel", result.success.len(), result.failed.len(), started);
        Metrics::batch_items("cancel", "omitted", result.omitted.len());
        Ok(result)
    }

    // =========================================================================
    // Pool positions
    // =========================================================================

    pub async fn settle(
        &self,
        options: Vec<OptionDescriptor>,
    ) -> ExecutorResult<BatchResult<PoolTransaction, OptionDescriptor>> {
        self.pool_batch(PoolAction::Settle, options).await
    }

    pub async fn exercise(
        &self,
        options: Vec<OptionDescriptor>,
    ) -> ExecutorResult<BatchResult<PoolTransaction, OptionDescriptor>> {
        self.pool_batch(PoolAction::Exercise, options).await
    }

    pub async fn annihilate(
        &self,
        options: Vec<OptionDescriptor>,
    ) -> ExecutorResult<BatchResult<PoolTransaction, OptionDescriptor>> {
        self.pool_batch(PoolAction::Annihilate, options).await
    }

    async fn pool_batch(
        &self,
        action: PoolAction,
        options: Vec<OptionDescriptor>,
    ) -> ExecutorResult<BatchResult<PoolTransaction, OptionDescriptor>> {
        let started = Instant::now();
        check_batch_size(options.len(), usize::MAX)?;
        let now = Utc::now().timestamp().max(0) as u64;

        let outcomes = join_all(
            options
                .iter()
                .map(|option| self.pool_action(action, option, now)),
        )
        .await;

        let result = BatchResult::partition(options.into_iter().zip(outcomes));
        self.record_batch(action.as_str(), result.success.len(), result.failed.len(), started);
        Ok(result)
    }

    async fn pool_action(
        &self,
        action: PoolAction,
        option: &OptionDescriptor,
        now: u64,
    ) -> ExecutorResult<PoolTransaction> {
        let key = self.resolver.derive_unchecked(option)?;
        let pool = self.resolver.require_deployed(&key).await?;
        let chain = self.chain();
        let holder = chain.sender();

        let data = match action {
            PoolAction::Settle | PoolAction::Exercise => {
                if key.maturity > now {
                    return Err(ExecutorError::NotExpired(option.to_string()));
                }
                let token_type = if action == PoolAction::Settle {
                    TokenType::Short
                } else {
                    TokenType::Long
                };
                let balance = chain.balance_of(pool, holder, token_type).await?;
                if balance.is_zero() {
                    return Err(ExecutorError::NoBalanceToSettle(option.to_string()));
                }
                if action == PoolAction::Settle {
                    IPool::settleCall {}.abi_encode()
                } else {
                    IPool::exerciseCall {}.abi_encode()
                }
            }
            PoolAction::Annihilate => {
                let (long, short) = tokio::try_join!(
                    chain.balance_of(pool, holder, TokenType::Long),
                    chain.balance_of(pool, holder, TokenType::Short),
                )?;
                let size = long.min(short);
                if size.is_zero() {
                    return Err(ExecutorError::NothingToAnnihilate(option.to_string()));
                }
                debug!(%pool, %size, "Annihilating matched position");
                IPool::annihilateCall { size }.abi_encode()
            }
        };

        let tx_hash = self.send(pool, data, action.as_str()).await?;
        Ok(PoolTransaction {
            option: option.clone(),
            pool_address: pool,
            tx_hash,
        })
    }

    // =========================================================================
    // Collateral
    // =========================================================================

    /// Approve the configured router to spend collateral tokens.
    pub async fn approve(
        &self,
        requests: Vec<ApprovalRequest>,
    ) -> ExecutorResult<BatchResult<ApprovalRecord, ApprovalRequest>> {
        let started = Instant::now();
        check_batch_size(requests.len(), usize::MAX)?;

        let outcomes = join_all(requests.iter().map(|request| self.approve_one(request))).await;

        let result = BatchResult::partition(requests.into_iter().zip(outcomes));
        self.record_batch("approve", result.success.len(), result.failed.len(), started);
        Ok(result)
    }

    async fn approve_one(&self, request: &ApprovalRequest) -> ExecutorResult<ApprovalRecord> {
        let token = self.resolver.tokens().require(&request.token)?;
        let amount = match request.amount {
            ApprovalAmount::Max => U256::MAX,
            ApprovalAmount::Exact(amount) => to_fixed(amount, u32::from(token.decimals))?,
        };
        let spender = self.config.erc20_router;
        let call = IERC20::approveCall { spender, amount };
        let tx_hash = self.send(token.address, call.abi_encode(), "approve").await?;
        Ok(ApprovalRecord {
            token: token.symbol.clone(),
            spender,
            tx_hash,
        })
    }

    /// ERC-20 balances of the gateway wallet for every configured token.
    pub async fn collateral_balances(&self) -> ExecutorResult<Vec<TokenBalance>> {
        try_join_all(
            self.resolver
                .tokens()
                .iter()
                .map(|token| self.wallet_balance(token.address)),
        )
        .await
    }

    async fn wallet_balance(&self, token: Address) -> ExecutorResult<TokenBalance> {
        let config = self
            .resolver
            .tokens()
            .by_address(&token)
            .ok_or_else(|| RegistryError::UnknownToken(token.to_string()))?;
        let chain = self.chain();
        let raw = chain.token_balance(token, chain.sender()).await?;
        Ok(TokenBalance {
            symbol: config.symbol.clone(),
            address: token,
            balance: from_fixed(raw, u32::from(config.decimals))?,
        })
    }

    // =========================================================================
    // Auxiliary reads
    // =========================================================================

    /// Oracle spot price of `base` in `quote`.
    pub async fn spot_price(&self, base: &str, quote: &str) -> ExecutorResult<Decimal> {
        let tokens = self.resolver.tokens();
        let base = tokens.require(base)?.address;
        let quote = tokens.require(quote)?.address;
        let price = retry::spot_price(self.chain().as_ref(), &self.config.retry, base, quote)
            .await
            .map_err(|e| {
                Metrics::upstream_error("chain");
                e
            })?;
        Ok(from_wad(price)?)
    }

    /// Last block mined at or before `timestamp`.
    pub async fn block_by_timestamp(&self, timestamp: u64) -> ExecutorResult<u64> {
        let block = retry::block_by_timestamp(self.chain().as_ref(), &self.config.retry, timestamp)
            .await
            .map_err(|e| {
                Metrics::upstream_error("chain");
                e
            })?;
        Ok(block)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Send a call and wait for the configured confirmations.
    async fn send(&self, to: Address, data: Vec<u8>, label: &'static str) -> ExecutorResult<B256> {
        let chain = self.chain();
        let tx = chain
            .transact(ContractCall {
                to,
                data: Bytes::from(data),
                label,
            })
            .await
            .map_err(|e| {
                warn!(%to, method = label, error = %e, "Transaction failed");
                e
            })?;
        chain
            .wait_for_confirmation(tx, self.config.confirmations)
            .await
            .map_err(|e| {
                warn!(%tx, method = label, error = %e, "Confirmation failed");
                e
            })?;
        info!(%to, %tx, method = label, "Transaction confirmed");
        Ok(tx)
    }

    fn record_batch(&self, op: &str, success: usize, failed: usize, started: Instant) {
        Metrics::batch_items(op, "success", success);
        Metrics::batch_items(op, "failed", failed);
        Metrics::batch_latency(op, started.elapsed().as_secs_f64() * 1000.0);
        info!(op, success, failed, "Batch complete");
    }
}
