//! Prometheus metrics for the gateway.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a programming error that should crash at
//! startup. These panics only occur during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Batch items by operation and outcome.
/// Labels: op (post/fill/cancel/settle/exercise/annihilate/approve), outcome (success/failed/omitted)
pub static BATCH_ITEMS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "premia_batch_items_total",
        "Batch items processed by operation and outcome",
        &["op", "outcome"]
    )
    .unwrap()
});

/// Batch latency in milliseconds.
pub static BATCH_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "premia_batch_latency_ms",
        "End-to-end batch latency in milliseconds",
        &["op"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 15000.0, 60000.0]
    )
    .unwrap()
});

/// Pool address cache lookups.
/// Labels: result (hit/miss)
pub static POOL_CACHE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "premia_pool_cache_total",
        "Pool address cache lookups",
        &["result"]
    )
    .unwrap()
});

/// Upstream call failures.
/// Labels: target (orderbook/chain/auth)
pub static UPSTREAM_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "premia_upstream_errors_total",
        "Failed calls to upstream services",
        &["target"]
    )
    .unwrap()
});

/// Open subscription connections.
pub static WS_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "premia_ws_connections",
        "Open WebSocket subscription connections"
    )
    .unwrap()
});

/// Events pushed to subscribers.
/// Labels: event (POST_QUOTE/FILL_QUOTE/DELETE_QUOTE/RFQ)
pub static WS_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "premia_ws_events_total",
        "Events delivered to subscribers",
        &["event"]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Record a batch item outcome.
    pub fn batch_item(op: &str, outcome: &str) {
        BATCH_ITEMS_TOTAL.with_label_values(&[op, outcome]).inc();
    }

    /// Record several outcomes at once.
    pub fn batch_items(op: &str, outcome: &str, count: usize) {
        if count > 0 {
            BATCH_ITEMS_TOTAL
                .with_label_values(&[op, outcome])
                .inc_by(count as f64);
        }
    }

    /// Record batch latency.
    pub fn batch_latency(op: &str, latency_ms: f64) {
        BATCH_LATENCY_MS.with_label_values(&[op]).observe(latency_ms);
    }

    pub fn pool_cache_hit() {
        POOL_CACHE_TOTAL.with_label_values(&["hit"]).inc();
    }

    pub fn pool_cache_miss() {
        POOL_CACHE_TOTAL.with_label_values(&["miss"]).inc();
    }

    /// Record an upstream failure.
    pub fn upstream_error(target: &str) {
        UPSTREAM_ERRORS_TOTAL.with_label_values(&[target]).inc();
    }

    pub fn ws_connection_opened() {
        WS_CONNECTIONS.inc();
    }

    pub fn ws_connection_closed() {
        WS_CONNECTIONS.dec();
    }

    /// Record an event delivered to a subscriber.
    pub fn ws_event(event: &str) {
        WS_EVENTS_TOTAL.with_label_values(&[event]).inc();
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn encode_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_item_counter() {
        let before = BATCH_ITEMS_TOTAL
            .with_label_values(&["fill", "success"])
            .get();
        Metrics::batch_item("fill", "success");
        Metrics::batch_items("fill", "success", 2);
        let after = BATCH_ITEMS_TOTAL
            .with_label_values(&["fill", "success"])
            .get();
        assert!(after - before >= 3.0);
    }

    #[test]
    fn test_encode_metrics_contains_registered_family() {
        Metrics::pool_cache_miss();
        let text = encode_metrics().unwrap();
        assert!(text.contains("premia_pool_cache_total"));
    }
}
