//! `/pool/*`: position settlement after expiry and annihilation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use premia_core::{BatchResult, OptionDescriptor};
use premia_executor::PoolTransaction;

use super::json_body;
use crate::app::GatewayContext;
use crate::error::ApiError;

type PoolBatch = Json<BatchResult<PoolTransaction, OptionDescriptor>>;

pub async fn settle(
    State(ctx): State<GatewayContext>,
    payload: Result<Json<Vec<OptionDescriptor>>, JsonRejection>,
) -> Result<PoolBatch, ApiError> {
    let options = json_body(payload)?;
    Ok(Json(ctx.orchestrator.settle(options).await?))
}

pub async fn exercise(
    State(ctx): State<GatewayContext>,
    payload: Result<Json<Vec<OptionDescriptor>>, JsonRejection>,
) -> Result<PoolBatch, ApiError> {
    let options = json_body(payload)?;
    Ok(Json(ctx.orchestrator.exercise(options).await?))
}

pub async fn annihilate(
    State(ctx): State<GatewayContext>,
    payload: Result<Json<Vec<OptionDescriptor>>, JsonRejection>,
) -> Result<PoolBatch, ApiError> {
    let options = json_body(payload)?;
    Ok(Json(ctx.orchestrator.annihilate(options).await?))
}
