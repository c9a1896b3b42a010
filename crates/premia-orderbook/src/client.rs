//! HTTP client for the external orderbook.

use std::time::Duration;

use premia_core::SignedQuote;
use premia_registry::BoxFuture;
use premia_telemetry::Metrics;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::OrderbookApi;
use crate::config::OrderbookConfig;
use crate::error::{OrderbookError, OrderbookResult};
use crate::types::{OrderQuery, OrderbookQuote, PostQuotesResponse, QuoteQuery};

/// Header carrying the API key, both inbound and towards the orderbook.
pub const API_KEY_HEADER: &str = "x-apikey";

/// Orderbook REST client.
pub struct OrderbookClient {
    client: Client,
    base_url: String,
    api_key: String,
    auth_path: String,
}

impl OrderbookClient {
    pub fn new(config: &OrderbookConfig) -> OrderbookResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| {
                OrderbookError::Transport(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            auth_path: config.auth_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> OrderbookResult<Response> {
        request.send().await.map_err(|e| {
            Metrics::upstream_error("orderbook");
            OrderbookError::Transport(e.to_string())
        })
    }

    /// Decode the body if the status matches, otherwise pass it through.
    async fn expect<T: DeserializeOwned>(
        response: Response,
        expected: StatusCode,
    ) -> OrderbookResult<T> {
        let status = response.status();
        if status != expected {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "Orderbook returned unexpected status");
            Metrics::upstream_error("orderbook");
            return Err(OrderbookError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| OrderbookError::Decode(e.to_string()))
    }
}

impl OrderbookApi for OrderbookClient {
    fn post_quotes(
        &self,
        quotes: Vec<SignedQuote>,
    ) -> BoxFuture<'_, OrderbookResult<PostQuotesResponse>> {
        Box::pin(async move {
            debug!(count = quotes.len(), "Posting quotes to orderbook");
            let request = self
                .client
                .post(self.url("/quotes"))
                .header(API_KEY_HEADER, &self.api_key)
                .json(&quotes);
            let response = self.send(request).await?;
            Self::expect(response, StatusCode::CREATED).await
        })
    }

    fn get_quotes(
        &self,
        query: QuoteQuery,
    ) -> BoxFuture<'_, OrderbookResult<Vec<OrderbookQuote>>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url("/quotes"))
                .header(API_KEY_HEADER, &self.api_key)
                .query(&query.to_params());
            let response = self.send(request).await?;
            Self::expect(response, StatusCode::OK).await
        })
    }

    fn get_orders(
        &self,
        query: OrderQuery,
    ) -> BoxFuture<'_, OrderbookResult<Vec<OrderbookQuote>>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url("/orders"))
                .header(API_KEY_HEADER, &self.api_key)
                .query(&query.to_params());
            let response = self.send(request).await?;
            Self::expect(response, StatusCode::OK).await
        })
    }

    fn validate_api_key<'a>(&'a self, api_key: &'a str) -> BoxFuture<'a, OrderbookResult<bool>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url(&self.auth_path))
                .header(API_KEY_HEADER, api_key);
            let response = self.send(request).await?;
            match response.status() {
                status if status.is_success() => Ok(true),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
                status => {
                    let body = response.text().await.unwrap_or_default();
                    Metrics::upstream_error("auth");
                    Err(OrderbookError::Upstream {
                        status: status.as_u16(),
                        body,
                    })
                }
            }
        })
    }
}
