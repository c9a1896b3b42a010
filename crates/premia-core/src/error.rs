//! Error types for premia-core.

use thiserror::Error;

/// Calendar rule violations for a maturity label.
///
/// The display strings are returned to API clients unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpirationError {
    #[error("Invalid expiration date: {0} could not be parsed")]
    Unparseable(String),

    #[error("Invalid expiration date: {0} is in the past")]
    InPast(String),

    #[error("Invalid expiration date: {0} is more than 1 year in the future")]
    TooFar(String),

    #[error("Invalid expiration date: {0} is not a Friday")]
    NotFriday(String),

    #[error("Invalid expiration date: {0} is not the last Friday of the month")]
    NotLastFridayOfMonth(String),
}

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    InvalidExpiration(#[from] ExpirationError),

    #[error("Batch too large: {size} items (max {max})")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Fixed-point conversion failed: {0}")]
    FixedPoint(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
