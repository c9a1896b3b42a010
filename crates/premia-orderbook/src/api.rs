//! Orderbook interface and an in-memory double.

use std::collections::HashSet;

use alloy::primitives::{Address, B256, U256};
use parking_lot::Mutex;
use premia_core::SignedQuote;
use premia_registry::BoxFuture;

use crate::error::{OrderbookError, OrderbookResult};
use crate::types::{OrderQuery, OrderbookQuote, PostQuotesResponse, QuoteQuery, RejectedQuote};

/// Operations the gateway needs from the external orderbook.
pub trait OrderbookApi: Send + Sync {
    /// Publish signed quotes.
    fn post_quotes(
        &self,
        quotes: Vec<SignedQuote>,
    ) -> BoxFuture<'_, OrderbookResult<PostQuotesResponse>>;

    /// Best active quotes for a pool, up to the requested size.
    fn get_quotes(
        &self,
        query: QuoteQuery,
    ) -> BoxFuture<'_, OrderbookResult<Vec<OrderbookQuote>>>;

    /// Active quotes by id or provider.
    fn get_orders(
        &self,
        query: OrderQuery,
    ) -> BoxFuture<'_, OrderbookResult<Vec<OrderbookQuote>>>;

    /// Check an API key with the auth service.
    fn validate_api_key<'a>(&'a self, api_key: &'a str) -> BoxFuture<'a, OrderbookResult<bool>>;
}

/// In-memory orderbook for tests.
///
/// Posted quotes become active and fully fillable. A quote id posted twice
/// is reported under `exists`.
#[derive(Debug, Default)]
pub struct MockOrderbook {
    quotes: Mutex<Vec<OrderbookQuote>>,
    api_keys: Mutex<HashSet<String>>,
    next_error: Mutex<Option<(u16, String)>>,
    rejected_providers: Mutex<HashSet<Address>>,
    posted: Mutex<Vec<SignedQuote>>,
}

impl MockOrderbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(self, key: &str) -> Self {
        self.api_keys.lock().insert(key.to_string());
        self
    }

    /// Insert an active quote directly.
    pub fn insert(&self, quote: OrderbookQuote) {
        self.quotes.lock().push(quote);
    }

    pub fn remove(&self, quote_id: &B256) {
        self.quotes.lock().retain(|q| q.quote_id != *quote_id);
    }

    pub fn set_fillable(&self, quote_id: &B256, fillable: U256) {
        for quote in self.quotes.lock().iter_mut() {
            if quote.quote_id == *quote_id {
                quote.fillable_size = fillable;
            }
        }
    }

    /// Fail the next call with this upstream status.
    pub fn fail_next(&self, status: u16, body: &str) {
        *self.next_error.lock() = Some((status, body.to_string()));
    }

    /// Report quotes from this provider under `failed`.
    pub fn reject_provider(&self, provider: Address) {
        self.rejected_providers.lock().insert(provider);
    }

    /// Quotes received by `post_quotes`.
    pub fn posted(&self) -> Vec<SignedQuote> {
        self.posted.lock().clone()
    }

    fn take_error(&self) -> OrderbookResult<()> {
        match self.next_error.lock().take() {
            Some((status, body)) => Err(OrderbookError::Upstream { status, body }),
            None => Ok(()),
        }
    }
}

impl OrderbookApi for MockOrderbook {
    fn post_quotes(
        &self,
        quotes: Vec<SignedQuote>,
    ) -> BoxFuture<'_, OrderbookResult<PostQuotesResponse>> {
        Box::pin(async move {
            self.take_error()?;
            let mut response = PostQuotesResponse::default();
            let rejected = self.rejected_providers.lock().clone();
            let mut active = self.quotes.lock();
            for quote in quotes {
                self.posted.lock().push(quote.clone());
                if rejected.contains(&quote.provider) {
                    response.failed.push(RejectedQuote {
                        reason: "provider rejected".to_string(),
                        quote,
                    });
                } else if let Some(existing) =
                    active.iter().find(|q| q.quote_id == quote.quote_id)
                {
                    response.exists.push(existing.clone());
                } else {
                    let record = OrderbookQuote::from_signed(&quote, 0);
                    active.push(record.clone());
                    response.created.push(record);
                }
            }
            Ok(response)
        })
    }

    fn get_quotes(
        &self,
        query: QuoteQuery,
    ) -> BoxFuture<'_, OrderbookResult<Vec<OrderbookQuote>>> {
        Box::pin(async move {
            self.take_error()?;
            let is_buy = query.side.is_buy();
            let mut remaining = query.size;
            let mut matched = Vec::new();
            for quote in self.quotes.lock().iter() {
                if remaining.is_zero() {
                    break;
                }
                if quote.pool_address != query.pool_address
                    || quote.chain_id != query.chain_id
                    || quote.is_buy != is_buy
                    || query.provider.is_some_and(|p| p != quote.provider)
                    || query.taker.is_some_and(|t| t != quote.taker)
                {
                    continue;
                }
                remaining = remaining.saturating_sub(quote.fillable_size);
                matched.push(quote.clone());
            }
            Ok(matched)
        })
    }

    fn get_orders(
        &self,
        query: OrderQuery,
    ) -> BoxFuture<'_, OrderbookResult<Vec<OrderbookQuote>>> {
        Box::pin(async move {
            self.take_error()?;
            let quotes = self.quotes.lock();
            let matched = match query {
                OrderQuery::ByIds {
                    chain_id,
                    quote_ids,
                } => quotes
                    .iter()
                    .filter(|q| q.chain_id == chain_id && quote_ids.contains(&q.quote_id))
                    .cloned()
                    .collect(),
                OrderQuery::ByProvider { chain_id, provider } => quotes
                    .iter()
                    .filter(|q| q.chain_id == chain_id && q.provider == provider)
                    .cloned()
                    .collect(),
            };
            Ok(matched)
        })
    }

    fn validate_api_key<'a>(&'a self, api_key: &'a str) -> BoxFuture<'a, OrderbookResult<bool>> {
        Box::pin(async move { Ok(self.api_keys.lock().contains(api_key)) })
    }
}
