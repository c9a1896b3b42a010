//! Pool key derivation and address resolution.
//!
//! `derive` is a pure mapping from an option series to its pool key.
//! Addresses are memoized per key for the process lifetime: the factory
//! address of a key never changes, only its deployment status does.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use premia_core::{
    compute_maturity_at, parse_maturity, to_wad, OptionDescriptor, PoolAddress, PoolKey,
};
use premia_telemetry::Metrics;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::chain::ChainClient;
use crate::error::{RegistryError, RegistryResult};
use crate::tokens::TokenTable;

/// Derives pool keys and caches factory lookups.
pub struct PoolKeyResolver {
    tokens: TokenTable,
    oracle_adapter: Address,
    chain: Arc<dyn ChainClient>,
    /// One cell per key so concurrent first resolutions share a lookup.
    cache: DashMap<PoolKey, Arc<OnceCell<PoolAddress>>>,
}

impl PoolKeyResolver {
    pub fn new(tokens: TokenTable, oracle_adapter: Address, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            tokens,
            oracle_adapter,
            chain,
            cache: DashMap::new(),
        }
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    /// Derive the pool key of a tradable series, enforcing calendar rules.
    pub fn derive(&self, descriptor: &OptionDescriptor) -> RegistryResult<PoolKey> {
        self.derive_at(descriptor, Utc::now())
    }

    /// `derive` evaluated at `now`.
    pub fn derive_at(
        &self,
        descriptor: &OptionDescriptor,
        now: DateTime<Utc>,
    ) -> RegistryResult<PoolKey> {
        let maturity = compute_maturity_at(&descriptor.expiration, now)
            .map_err(premia_core::CoreError::from)?;
        self.build_key(descriptor, maturity)
    }

    /// Derive the pool key of any series, including expired ones.
    pub fn derive_unchecked(&self, descriptor: &OptionDescriptor) -> RegistryResult<PoolKey> {
        let maturity =
            parse_maturity(&descriptor.expiration).map_err(premia_core::CoreError::from)?;
        self.build_key(descriptor, maturity)
    }

    fn build_key(&self, descriptor: &OptionDescriptor, maturity: u64) -> RegistryResult<PoolKey> {
        let base = self.tokens.require(&descriptor.base)?;
        let quote = self.tokens.require(&descriptor.quote)?;
        if base.address == quote.address {
            return Err(RegistryError::InvalidDescriptor(
                "base and quote must differ".to_string(),
            ));
        }
        if descriptor.strike <= rust_decimal::Decimal::ZERO {
            return Err(RegistryError::InvalidDescriptor(
                "strike must be greater than 0".to_string(),
            ));
        }
        let strike: U256 = to_wad(descriptor.strike)?;

        Ok(PoolKey {
            base: base.address,
            quote: quote.address,
            oracle_adapter: self.oracle_adapter,
            strike,
            maturity,
            is_call_pool: descriptor.is_call(),
        })
    }

    /// Resolve the pool address for a key, consulting the cache first.
    ///
    /// Undeployed pools are returned and cached too.
    pub async fn resolve_address(&self, key: &PoolKey) -> RegistryResult<PoolAddress> {
        let cell = self
            .cache
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(pool) = cell.get() {
            Metrics::pool_cache_hit();
            return Ok(*pool);
        }

        let pool = cell
            .get_or_try_init(|| async {
                Metrics::pool_cache_miss();
                self.lookup(key).await
            })
            .await?;
        Ok(*pool)
    }

    /// Resolve a key whose pool must already be deployed.
    ///
    /// A pool cached as undeployed is looked up again since it may have been
    /// deployed in the meantime.
    pub async fn require_deployed(&self, key: &PoolKey) -> RegistryResult<Address> {
        let cached = self.resolve_address(key).await?;
        if cached.deployed {
            return Ok(cached.address);
        }

        let fresh = self.lookup(key).await?;
        if !fresh.deployed {
            return Err(RegistryError::PoolNotDeployed(fresh.address));
        }

        debug!(pool = %fresh.address, "Pool now deployed, refreshing cache");
        self.cache
            .insert(key.clone(), Arc::new(OnceCell::new_with(Some(fresh))));
        Ok(fresh.address)
    }

    /// Number of cached keys.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Factory lookup, retried once on a transient failure.
    async fn lookup(&self, key: &PoolKey) -> RegistryResult<PoolAddress> {
        let pool = match self.chain.get_pool_address(key).await {
            Ok(pool) => pool,
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Pool lookup failed, retrying once");
                self.chain.get_pool_address(key).await.map_err(|e| {
                    Metrics::upstream_error("chain");
                    RegistryError::PoolLookupFailed(e.to_string())
                })?
            }
            Err(e) => {
                Metrics::upstream_error("chain");
                return Err(RegistryError::PoolLookupFailed(e.to_string()));
            }
        };

        if !pool.deployed {
            warn!(
                pool = %pool.address,
                maturity = key.maturity,
                is_call = key.is_call_pool,
                "Pool is not deployed yet"
            );
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use crate::error::ChainError;
    use crate::tokens::TokenConfig;
    use chrono::TimeZone;
    use premia_core::{ExpirationError, OptionType};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn weth() -> Address {
        Address::repeat_byte(0x11)
    }

    fn usdc() -> Address {
        Address::repeat_byte(0x22)
    }

    fn oracle() -> Address {
        Address::repeat_byte(0x0a)
    }

    fn now() -> DateTime<Utc> {
        // Monday
        Utc.with_ymd_and_hms(2026, 2, 9, 12, 0, 0).unwrap()
    }

    fn resolver(chain: Arc<MockChainClient>) -> PoolKeyResolver {
        let tokens = TokenTable::new(&[
            TokenConfig {
                symbol: "WETH".to_string(),
                address: weth(),
                decimals: 18,
            },
            TokenConfig {
                symbol: "USDC".to_string(),
                address: usdc(),
                decimals: 6,
            },
        ])
        .unwrap();
        PoolKeyResolver::new(tokens, oracle(), chain)
    }

    fn descriptor() -> OptionDescriptor {
        OptionDescriptor {
            base: "WETH".to_string(),
            quote: "USDC".to_string(),
            expiration: "27MAR26".to_string(),
            strike: dec!(1500),
            option_type: OptionType::Call,
        }
    }

    #[test]
    fn test_derive_is_deterministic() {
        let r = resolver(Arc::new(MockChainClient::default()));
        let a = r.derive_at(&descriptor(), now()).unwrap();
        let b = r.derive_at(&descriptor(), now()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.base, weth());
        assert_eq!(a.quote, usdc());
        assert_eq!(a.oracle_adapter, oracle());
        assert_eq!(a.strike, to_wad(dec!(1500)).unwrap());
        assert!(a.is_call_pool);
    }

    #[test]
    fn test_derive_distinguishes_economic_terms() {
        let r = resolver(Arc::new(MockChainClient::default()));
        let base = r.derive_at(&descriptor(), now()).unwrap();

        let mut put = descriptor();
        put.option_type = OptionType::Put;
        let mut strike = descriptor();
        strike.strike = dec!(1600);
        let mut expiry = descriptor();
        expiry.expiration = "24APR26".to_string();
        let mut symbol_case = descriptor();
        symbol_case.base = "weth".to_string();

        assert_ne!(base, r.derive_at(&put, now()).unwrap());
        assert_ne!(base, r.derive_at(&strike, now()).unwrap());
        assert_ne!(base, r.derive_at(&expiry, now()).unwrap());
        // same economic terms, different spelling
        assert_eq!(base, r.derive_at(&symbol_case, now()).unwrap());
    }

    #[test]
    fn test_derive_errors() {
        let r = resolver(Arc::new(MockChainClient::default()));

        let mut unknown = descriptor();
        unknown.base = "WBTC".to_string();
        assert!(matches!(
            r.derive_at(&unknown, now()),
            Err(RegistryError::UnknownToken(_))
        ));

        let mut same = descriptor();
        same.quote = "WETH".to_string();
        assert!(matches!(
            r.derive_at(&same, now()),
            Err(RegistryError::InvalidDescriptor(_))
        ));

        let mut past = descriptor();
        past.expiration = "03NOV23".to_string();
        let err = r.derive_at(&past, now()).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Core(premia_core::CoreError::InvalidExpiration(
                ExpirationError::InPast(_)
            ))
        ));
        assert_eq!(
            err.to_string(),
            "Invalid expiration date: 03NOV23 is in the past"
        );
    }

    #[test]
    fn test_derive_unchecked_accepts_expired() {
        let r = resolver(Arc::new(MockChainClient::default()));
        let mut past = descriptor();
        past.expiration = "03NOV23".to_string();
        let key = r.derive_unchecked(&past).unwrap();
        assert_eq!(key.maturity, 1_698_998_400);
    }

    #[tokio::test]
    async fn test_resolve_address_is_cached() {
        let chain = Arc::new(MockChainClient::default());
        let r = resolver(chain.clone());
        let key = r.derive_at(&descriptor(), now()).unwrap();

        let first = r.resolve_address(&key).await.unwrap();
        let second = r.resolve_address(&key).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(chain.lookup_count(), 1);
        assert_eq!(r.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_resolutions_share_one_lookup() {
        let chain = Arc::new(MockChainClient::default());
        chain.set_lookup_delay(Duration::from_millis(20));
        let r = Arc::new(resolver(chain.clone()));
        let key = r.derive_at(&descriptor(), now()).unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let r = r.clone();
                let key = key.clone();
                tokio::spawn(async move { r.resolve_address(&key).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(chain.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let chain = Arc::new(MockChainClient::default());
        chain.push_lookup_failure(ChainError::Transport("timeout".to_string()));
        let r = resolver(chain.clone());
        let key = r.derive_at(&descriptor(), now()).unwrap();

        assert!(r.resolve_address(&key).await.is_ok());
        assert_eq!(chain.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_second_transient_failure_fails_lookup() {
        let chain = Arc::new(MockChainClient::default());
        chain.push_lookup_failure(ChainError::Transport("timeout".to_string()));
        chain.push_lookup_failure(ChainError::Transport("timeout".to_string()));
        let r = resolver(chain.clone());
        let key = r.derive_at(&descriptor(), now()).unwrap();

        assert!(matches!(
            r.resolve_address(&key).await,
            Err(RegistryError::PoolLookupFailed(_))
        ));
        // failed lookups are not cached
        assert!(r.resolve_address(&key).await.is_ok());
        assert_eq!(chain.lookup_count(), 3);
    }

    #[tokio::test]
    async fn test_non_transient_failure_not_retried() {
        let chain = Arc::new(MockChainClient::default());
        chain.push_lookup_failure(ChainError::Rpc {
            code: 3,
            message: "execution reverted".to_string(),
        });
        let r = resolver(chain.clone());
        let key = r.derive_at(&descriptor(), now()).unwrap();

        assert!(matches!(
            r.resolve_address(&key).await,
            Err(RegistryError::PoolLookupFailed(_))
        ));
        assert_eq!(chain.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_undeployed_pool_is_returned_and_cached() {
        let chain = Arc::new(MockChainClient::default());
        chain.set_default_deployed(false);
        let r = resolver(chain.clone());
        let key = r.derive_at(&descriptor(), now()).unwrap();

        let pool = r.resolve_address(&key).await.unwrap();
        assert!(!pool.deployed);
        assert_eq!(pool.address, MockChainClient::derived_pool_address(&key));

        assert!(matches!(
            r.require_deployed(&key).await,
            Err(RegistryError::PoolNotDeployed(_))
        ));
    }

    #[tokio::test]
    async fn test_require_deployed_refreshes_after_deployment() {
        let chain = Arc::new(MockChainClient::default());
        chain.set_default_deployed(false);
        let r = resolver(chain.clone());
        let key = r.derive_at(&descriptor(), now()).unwrap();
        r.resolve_address(&key).await.unwrap();

        chain.set_default_deployed(true);
        let address = r.require_deployed(&key).await.unwrap();
        assert_eq!(address, MockChainClient::derived_pool_address(&key));
        assert!(r.resolve_address(&key).await.unwrap().deployed);

        let lookups = chain.lookup_count();
        r.require_deployed(&key).await.unwrap();
        assert_eq!(chain.lookup_count(), lookups);
    }
}
