//! Risk error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Input mismatch: {positions} positions but {greeks} greeks results")]
    InputMismatch { positions: usize, greeks: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
