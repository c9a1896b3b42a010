//! Bounded retries for auxiliary chain reads.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::Address;
use premia_registry::{ChainClient, ChainError, ChainResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fixed-delay retry with a cap on attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Run `op` until it succeeds, fails permanently or attempts run out.
    ///
    /// Only transient chain errors are retried.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> ChainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ChainResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(what, attempt, max_attempts = attempts, error = %e, "Retrying chain read");
                    tokio::time::sleep(self.delay()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Oracle spot price of `base` in `quote`, 18-decimal fixed point.
pub async fn spot_price(
    chain: &dyn ChainClient,
    policy: &RetryPolicy,
    base: Address,
    quote: Address,
) -> ChainResult<alloy::primitives::U256> {
    policy
        .run("spot_price", || chain.spot_price(base, quote))
        .await
}

/// Highest block whose timestamp is at or before `timestamp`.
///
/// Binary search over `[0, latest]`; each header read is retried.
pub async fn block_by_timestamp(
    chain: &dyn ChainClient,
    policy: &RetryPolicy,
    timestamp: u64,
) -> ChainResult<u64> {
    let latest = policy
        .run("latest_block_number", || chain.latest_block_number())
        .await?;

    let genesis = policy
        .run("block_timestamp", || chain.block_timestamp(0))
        .await?;
    if timestamp < genesis {
        return Err(ChainError::Rpc {
            code: -32602,
            message: format!("timestamp {timestamp} precedes the first block"),
        });
    }

    let mut low = 0u64;
    let mut high = latest;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        let ts = policy
            .run("block_timestamp", || chain.block_timestamp(mid))
            .await?;
        if ts <= timestamp {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}
