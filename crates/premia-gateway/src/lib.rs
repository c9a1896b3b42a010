//! HTTP and WebSocket gateway for Premia orderbook quotes and pool settlement.
//!
//! - `AppConfig`: TOML configuration with environment overrides
//! - `GatewayContext`: collaborators shared by every handler
//! - `router`: axum routes, `x-apikey` guard and the `/ws` stream

pub mod app;
pub mod config;
pub mod error;
pub mod routes;

pub use app::{router, serve, GatewayContext};
pub use config::AppConfig;
pub use error::{ApiError, AppError, AppResult};
