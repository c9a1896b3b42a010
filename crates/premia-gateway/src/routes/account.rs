//! `/account/*`: collateral approvals and wallet balances.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use premia_core::BatchResult;
use premia_executor::{ApprovalRecord, ApprovalRequest, TokenBalance};

use super::json_body;
use crate::app::GatewayContext;
use crate::error::ApiError;

pub async fn approve(
    State(ctx): State<GatewayContext>,
    payload: Result<Json<Vec<ApprovalRequest>>, JsonRejection>,
) -> Result<Json<BatchResult<ApprovalRecord, ApprovalRequest>>, ApiError> {
    let requests = json_body(payload)?;
    Ok(Json(ctx.orchestrator.approve(requests).await?))
}

pub async fn collateral_balances(
    State(ctx): State<GatewayContext>,
) -> Result<Json<Vec<TokenBalance>>, ApiError> {
    Ok(Json(ctx.orchestrator.collateral_balances().await?))
}
