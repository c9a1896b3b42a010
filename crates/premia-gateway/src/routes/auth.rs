//! `x-apikey` check for protected routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use premia_orderbook::API_KEY_HEADER;
use tracing::debug;

use crate::app::GatewayContext;
use crate::error::ApiError;

pub async fn require_api_key(
    State(ctx): State<GatewayContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ApiError::unauthorized("Missing x-apikey header"))?;

    if !ctx.auth.validate_api_key(&api_key).await? {
        debug!(path = %request.uri().path(), "Rejected invalid API key");
        return Err(ApiError::unauthorized("Invalid API key"));
    }

    Ok(next.run(request).await)
}
