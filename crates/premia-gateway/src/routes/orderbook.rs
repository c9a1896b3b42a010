//! `/orderbook/*`: quote publication, fills, cancellation and lookups.

use alloy::primitives::{Address, B256};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use premia_core::{list_maturities, BatchResult, CancelResult, FillRequest, MaturityEntry, QuoteRequest};
use premia_executor::QuoteLookup;
use premia_orderbook::{NormalizedPostResponse, NormalizedQuote};
use serde::Deserialize;

use super::{json_body, query_params};
use crate::app::GatewayContext;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBody {
    pub quote_ids: Vec<B256>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    /// Comma-separated quote ids.
    #[serde(default)]
    pub quote_ids: Option<String>,
    #[serde(default)]
    pub provider: Option<Address>,
}

impl OrdersQuery {
    fn parse_ids(&self) -> Result<Option<Vec<B256>>, ApiError> {
        let Some(raw) = self.quote_ids.as_deref() else {
            return Ok(None);
        };
        let ids = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<B256>()
                    .map_err(|_| ApiError::bad_request(format!("invalid quoteId: {s}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(ids))
    }
}

pub async fn post_quotes(
    State(ctx): State<GatewayContext>,
    payload: Result<Json<Vec<QuoteRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<NormalizedPostResponse>), ApiError> {
    let requests = json_body(payload)?;
    let response = ctx.orchestrator.post_quotes(requests).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn fill_quotes(
    State(ctx): State<GatewayContext>,
    payload: Result<Json<Vec<FillRequest>>, JsonRejection>,
) -> Result<Json<BatchResult<B256>>, ApiError> {
    let fills = json_body(payload)?;
    Ok(Json(ctx.orchestrator.fill_quotes(fills).await?))
}

pub async fn cancel_quotes(
    State(ctx): State<GatewayContext>,
    payload: Result<Json<CancelBody>, JsonRejection>,
) -> Result<Json<CancelResult<B256>>, ApiError> {
    let body = json_body(payload)?;
    Ok(Json(ctx.orchestrator.cancel_quotes(body.quote_ids).await?))
}

pub async fn get_quotes(
    State(ctx): State<GatewayContext>,
    query: Result<Query<QuoteLookup>, QueryRejection>,
) -> Result<Json<Vec<NormalizedQuote>>, ApiError> {
    let lookup = query_params(query)?;
    Ok(Json(ctx.orchestrator.get_quotes(&lookup).await?))
}

pub async fn get_orders(
    State(ctx): State<GatewayContext>,
    query: Result<Query<OrdersQuery>, QueryRejection>,
) -> Result<Json<Vec<NormalizedQuote>>, ApiError> {
    let query = query_params(query)?;
    let quote_ids = query.parse_ids()?;
    Ok(Json(
        ctx.orchestrator.get_orders(quote_ids, query.provider).await?,
    ))
}

pub async fn maturities() -> Json<Vec<MaturityEntry>> {
    Json(list_maturities())
}
