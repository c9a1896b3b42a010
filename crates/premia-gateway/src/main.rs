//! Premia gateway entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Premia options quote and settlement gateway
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PREMIA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // TLS provider must be installed before any outbound connection
    premia_ws::init_crypto();

    let args = Args::parse();

    premia_telemetry::init_logging()?;

    info!("Starting Premia gateway v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > PREMIA_CONFIG > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PREMIA_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = premia_gateway::AppConfig::load(&config_path)?;
    info!(
        chain_id = config.chain.chain_id,
        orderbook = %config.orderbook.rest_url,
        "Configuration loaded"
    );

    premia_gateway::serve(config).await?;

    Ok(())
}
