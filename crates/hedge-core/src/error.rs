//! Error types for hedge-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Unknown volatility regime: {0}")]
    UnknownRegime(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
