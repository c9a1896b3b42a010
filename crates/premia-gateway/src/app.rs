//! Gateway wiring: shared context, router and server lifecycle.

use std::sync::Arc;

use axum::extract::Request;
use axum::routing::{get, post};
use axum::{middleware, Router};
use premia_executor::{KeyManager, QuoteSigner, SettlementOrchestrator, SystemClock};
use premia_orderbook::{OrderbookApi, OrderbookClient};
use premia_registry::{ChainClient, PoolKeyResolver, RpcChainClient, TokenTable};
use premia_ws::{ws_router, SubscriptionHub, UpstreamRelay};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::routes::{account, auth, chain, orderbook, pool, system};

/// Everything the handlers share. Built once at startup.
#[derive(Clone)]
pub struct GatewayContext {
    pub orchestrator: Arc<SettlementOrchestrator>,
    /// API-key verification service.
    pub auth: Arc<dyn OrderbookApi>,
    pub hub: Arc<SubscriptionHub>,
}

impl GatewayContext {
    pub fn new(
        orchestrator: Arc<SettlementOrchestrator>,
        auth: Arc<dyn OrderbookApi>,
        hub: Arc<SubscriptionHub>,
    ) -> Self {
        Self {
            orchestrator,
            auth,
            hub,
        }
    }

    /// The maker key signs both quotes and the transactions that fill,
    /// cancel and settle them.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let key = KeyManager::load(&config.signer.key_source(), config.signer.expected_address)?;
        info!(maker = %key.address(), "Maker key loaded");

        let chain: Arc<dyn ChainClient> =
            Arc::new(RpcChainClient::new(&config.chain, key.signer().clone())?);
        let tokens = TokenTable::new(&config.chain.tokens)?;
        let resolver = Arc::new(PoolKeyResolver::new(
            tokens,
            config.chain.oracle_adapter,
            chain,
        ));

        let signer = Arc::new(QuoteSigner::new(
            Arc::new(key.into_signer()),
            config.chain.chain_id,
            Arc::new(SystemClock),
        ));

        let orderbook: Arc<dyn OrderbookApi> = Arc::new(OrderbookClient::new(&config.orderbook)?);
        let orchestrator = Arc::new(SettlementOrchestrator::new(
            resolver,
            signer,
            orderbook.clone(),
            config.orchestrator(),
        )?);
        let hub = Arc::new(SubscriptionHub::new(orderbook.clone(), config.hub.clone()));

        Ok(Self::new(orchestrator, orderbook, hub))
    }
}

/// Build the HTTP and WebSocket router.
pub fn router(ctx: GatewayContext) -> Router {
    let protected = Router::new()
        .route(
            "/orderbook/quotes",
            post(orderbook::post_quotes)
                .patch(orderbook::fill_quotes)
                .delete(orderbook::cancel_quotes)
                .get(orderbook::get_quotes),
        )
        .route("/orderbook/orders", get(orderbook::get_orders))
        .route("/orderbook/maturities", get(orderbook::maturities))
        .route("/pool/settle", post(pool::settle))
        .route("/pool/exercise", post(pool::exercise))
        .route("/pool/annihilate", post(pool::annihilate))
        .route("/account/collateral/approval", post(account::approve))
        .route(
            "/account/collateral_balances",
            get(account::collateral_balances),
        )
        .route("/oracles/spot", get(chain::spot_price))
        .route("/blocks/by-timestamp", get(chain::block_by_timestamp))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .merge(protected)
        .with_state(ctx.clone())
        .merge(ws_router(ctx.hub))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                info_span!(
                    "http",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
}

/// Run the gateway until Ctrl-C.
pub async fn serve(config: AppConfig) -> AppResult<()> {
    let ctx = GatewayContext::from_config(&config)?;

    let relay = (config.relay.enabled && !config.orderbook.ws_url.is_empty())
        .then(|| Arc::new(UpstreamRelay::new(config.relay(), ctx.hub.clone())));
    let relay_task = relay.clone().map(|relay| {
        tokio::spawn(async move {
            if let Err(e) = relay.run().await {
                error!(error = %e, "Upstream relay stopped");
            }
        })
    });
    if relay.is_none() {
        warn!("Upstream relay disabled, WS clients will receive no events");
    }

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, chain_id = config.chain.chain_id, "Gateway listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(relay) = relay {
        relay.shutdown();
    }
    if let Some(task) = relay_task {
        let _ = task.await;
    }
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
