//! Startup and HTTP error types.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use premia_core::CoreError;
use premia_executor::{ExecutorError, KeyError};
use premia_orderbook::OrderbookError;
use premia_registry::{ChainError, RegistryError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Orderbook error: {0}")]
    Orderbook(#[from] OrderbookError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] premia_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Error returned by an HTTP handler.
#[derive(Debug)]
pub enum ApiError {
    /// `{"message"}` body with the given status.
    Message { status: StatusCode, message: String },
    /// Upstream response relayed verbatim.
    Passthrough { status: StatusCode, body: String },
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Message {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Message { status, .. } | Self::Passthrough { status, .. } => *status,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        error!(error = %e, "Chain request failed");
        Self::internal(e.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Core(e) => e.into(),
            RegistryError::Chain(e) => e.into(),
            RegistryError::PoolNotDeployed(_) => Self::new(StatusCode::BAD_GATEWAY, e.to_string()),
            RegistryError::DuplicateToken(_) => Self::internal(e.to_string()),
            RegistryError::UnknownToken(_)
            | RegistryError::InvalidDescriptor(_)
            | RegistryError::PoolLookupFailed(_) => Self::bad_request(e.to_string()),
        }
    }
}

impl From<OrderbookError> for ApiError {
    fn from(e: OrderbookError) -> Self {
        match e {
            OrderbookError::Upstream { status, body } if status < 500 => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                Self::Passthrough { status, body }
            }
            other => {
                error!(error = %other, "Orderbook request failed");
                Self::internal(other.to_string())
            }
        }
    }
}

impl From<ExecutorError> for ApiError {
    fn from(e: ExecutorError) -> Self {
        match e {
            ExecutorError::Core(e) => e.into(),
            ExecutorError::Registry(e) => e.into(),
            ExecutorError::Orderbook(e) => e.into(),
            ExecutorError::Chain(e) => e.into(),
            ExecutorError::Signer(e) => {
                error!(error = %e, "Signing failed");
                Self::internal(e.to_string())
            }
            ExecutorError::SenderMismatch { .. } => Self::internal(e.to_string()),
            ExecutorError::InsufficientCollateral(_)
            | ExecutorError::QuoteNotFound(_)
            | ExecutorError::ExceedsFillable
            | ExecutorError::NotExpired(_)
            | ExecutorError::NoBalanceToSettle(_)
            | ExecutorError::NothingToAnnihilate(_)
            | ExecutorError::NotQuoteProvider(_) => Self::bad_request(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Message { status, message } => {
                if status.is_server_error() {
                    warn!(status = status.as_u16(), %message, "Request failed");
                }
                (status, Json(json!({ "message": message }))).into_response()
            }
            Self::Passthrough { status, body } => {
                let content_type = if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
                    "application/json"
                } else {
                    "text/plain; charset=utf-8"
                };
                (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
            }
        }
    }
}
