use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::app::GatewayContext;
use crate::error::ApiError;

pub async fn health(State(ctx): State<GatewayContext>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "wsConnections": ctx.hub.connection_count(),
    }))
}

/// Prometheus text exposition.
pub async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let body = premia_telemetry::encode_metrics().map_err(|e| ApiError::internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    ))
}
