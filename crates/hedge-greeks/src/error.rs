//! Greeks error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GreeksError {
    /// Non-positive or non-finite price, strike or volatility.
    #[error("Invalid market data for {symbol}: {reason}")]
    InvalidMarketData { symbol: String, reason: String },
}

impl GreeksError {
    pub fn invalid(symbol: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMarketData {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

pub type GreeksResult<T> = Result<T, GreeksError>;
