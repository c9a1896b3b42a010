//! Oracle spot price and block lookup.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Json, Query, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::query_params;
use crate::app::GatewayContext;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SpotQuery {
    pub base: String,
    pub quote: String,
}

#[derive(Debug, Serialize)]
pub struct SpotPrice {
    pub base: String,
    pub quote: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BlockQuery {
    pub ts: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAtTimestamp {
    pub timestamp: u64,
    pub block_number: u64,
}

pub async fn spot_price(
    State(ctx): State<GatewayContext>,
    query: Result<Query<SpotQuery>, QueryRejection>,
) -> Result<Json<SpotPrice>, ApiError> {
    let SpotQuery { base, quote } = query_params(query)?;
    let price = ctx.orchestrator.spot_price(&base, &quote).await?;
    Ok(Json(SpotPrice { base, quote, price }))
}

pub async fn block_by_timestamp(
    State(ctx): State<GatewayContext>,
    query: Result<Query<BlockQuery>, QueryRejection>,
) -> Result<Json<BlockAtTimestamp>, ApiError> {
    let BlockQuery { ts } = query_params(query)?;
    let block_number = ctx.orchestrator.block_by_timestamp(ts).await?;
    Ok(Json(BlockAtTimestamp {
        timestamp: ts,
        block_number,
    }))
}
